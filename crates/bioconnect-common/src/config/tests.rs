#[cfg(test)]
mod tests {
    use super::super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.registry.path, "config/connectors.yaml");
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.http.allowed_domains.is_empty());
        assert!(config.connectors.spec_dir.is_none());
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_source_sections_parse() {
        let config = Config::from_toml_str(r#"
            [registry]
            path = "/var/lib/bioconnect/connectors.yaml"

            [http]
            timeout_secs = 10
            allowed_domains = ["api.example.org"]

            [sources.pubmed]
            api_key = "abc123"

            [sources.openalex]
            email = "curator@example.org"
            requests_per_second = 5.0
        "#).unwrap();

        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.source("pubmed").unwrap().api_key.as_deref(), Some("abc123"));
        let openalex = config.source("openalex").unwrap();
        assert_eq!(openalex.email.as_deref(), Some("curator@example.org"));
        assert_eq!(openalex.requests_per_second, Some(5.0));
        assert!(config.source("europe_pmc").is_none());
    }

    #[test]
    fn test_non_positive_source_rate_rejected() {
        let err = Config::from_toml_str(r#"
            [sources.pubmed]
            requests_per_second = 0.0
        "#).unwrap_err();
        assert!(matches!(err, BioconnectError::Config(_)), "got {err}");
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = Config::load_from("/nonexistent/bioconnect.toml").unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[connectors]\nspec_dir = \"./connectors\"").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.connectors.spec_dir.as_deref(), Some("./connectors"));
    }
}
