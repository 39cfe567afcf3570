/// Join `segment` onto `base` with exactly one `/` between them.
#[must_use]
pub fn add_url_segment(base: &str, segment: &str) -> String {
    match (base.ends_with('/'), segment.starts_with('/')) {
        (true, true) => format!("{base}{}", segment.strip_prefix('/').unwrap_or(segment)),
        (true, false) | (false, true) => format!("{base}{segment}"),
        (false, false) => format!("{base}/{segment}"),
    }
}

/// Definition URL of the job named `job_name` on `server_url`.
#[must_use]
pub fn job_url(server_url: &str, job_name: &str) -> String {
    add_url_segment(server_url, &format!("/job/{}", job_name.trim_matches('/')))
}

/// URL of numbered execution `number` of the job at `definition_url`.
#[must_use]
pub fn execution_url(definition_url: &str, number: u64) -> String {
    add_url_segment(definition_url, &number.to_string())
}

/// JSON API URL for any Jenkins object URL.
#[must_use]
pub fn api_json_url(object_url: &str) -> String {
    add_url_segment(object_url, "api/json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_url_segment_collapses_double_slash() {
        assert_eq!(add_url_segment("http://ci/", "/job/a"), "http://ci/job/a");
    }

    #[test]
    fn add_url_segment_keeps_single_slash() {
        assert_eq!(add_url_segment("http://ci/", "job/a"), "http://ci/job/a");
        assert_eq!(add_url_segment("http://ci", "/job/a"), "http://ci/job/a");
    }

    #[test]
    fn add_url_segment_inserts_missing_slash() {
        assert_eq!(add_url_segment("http://ci", "job/a"), "http://ci/job/a");
    }

    #[test]
    fn job_and_execution_urls() {
        let job = job_url("http://ci:8080/", "deploy");
        assert_eq!(job, "http://ci:8080/job/deploy");
        assert_eq!(execution_url(&job, 42), "http://ci:8080/job/deploy/42");
        assert_eq!(
            api_json_url("http://ci:8080/job/deploy/42/"),
            "http://ci:8080/job/deploy/42/api/json"
        );
    }
}
