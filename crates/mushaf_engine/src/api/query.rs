use mushaf_base::{MushafError, MushafResult};
use percent_encoding::percent_decode_str;

/// Decoded query-string parameters of a request path, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: Vec<(String, String)>,
}

fn decode(component: &str) -> String {
    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

impl QueryParams {
    /// Parse the part of `path` after `?`; a path without one has no parameters.
    pub fn from_path(path: &str) -> Self {
        let Some((_, query)) = path.split_once('?') else {
            return Self::default();
        };
        let params = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (decode(key), decode(value)),
                None => (decode(pair), String::new()),
            })
            .collect();
        Self { params }
    }

    /// First value of a parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    /// All values of a repeated parameter.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn bool(&self, key: &str, default: bool) -> MushafResult<bool> {
        match self.get(key) {
            None => Ok(default),
            Some("true" | "1" | "yes") => Ok(true),
            Some("false" | "0" | "no") => Ok(false),
            Some(other) => Err(Box::new(MushafError::invalid_argument(
                format!("Invalid value '{}' for parameter '{}'", other, key),
                vec!["true".to_string(), "false".to_string()],
            ))),
        }
    }

    pub fn usize(&self, key: &str) -> MushafResult<Option<usize>> {
        self.get(key)
            .map(|value| {
                value.parse::<usize>().map_err(|_| {
                    Box::new(MushafError::invalid_argument(
                        format!("Parameter '{}' must be a non-negative integer, got '{}'", key, value),
                        Vec::new(),
                    ))
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_query_string() {
        let params = QueryParams::from_path("/api/search");
        assert!(params.get("q").is_none());
        assert!(params.get_all("q").is_empty());
    }

    #[test]
    fn test_percent_and_plus_decoding() {
        let params = QueryParams::from_path(
            "/api/search?q=%D8%A7%D9%84%D8%B1%D8%AD%D9%85%D9%86&translation=en.sahih&x=a+b%2Bc",
        );
        assert_eq!(params.get("q"), Some("الرحمن"));
        assert_eq!(params.get("translation"), Some("en.sahih"));
        assert_eq!(params.get("x"), Some("a b+c"));
    }

    #[test]
    fn test_repeated_parameters() {
        let params = QueryParams::from_path("/api/search?q=a&limit=3&q=b&&q");
        assert_eq!(params.get_all("q"), vec!["a", "b", ""]);
        assert_eq!(params.get("q"), Some("a"));
    }

    #[test]
    fn test_bool_parameters() {
        let params = QueryParams::from_path("/?a=true&b=0&c=maybe");
        assert!(params.bool("a", false).unwrap());
        assert!(!params.bool("b", true).unwrap());
        assert!(params.bool("missing", true).unwrap());
        let err = params.bool("c", true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value 'maybe' for parameter 'c' (valid: true, false)"
        );
    }

    #[test]
    fn test_usize_parameters() {
        let params = QueryParams::from_path("/?limit=10&offset=-1");
        assert_eq!(params.usize("limit").unwrap(), Some(10));
        assert_eq!(params.usize("missing").unwrap(), None);
        assert!(params.usize("offset").unwrap_err().is_invalid_argument());
    }
}
