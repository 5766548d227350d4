use std::collections::HashMap;

/// Parse query parameters from a URI string
///
/// Handles URL decoding (including `+` as space) and returns a HashMap of
/// parameter key-value pairs. Only the last value of a repeated key is kept.
///
/// # Example
/// ```
/// use social_plus::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/images/?page=2&title=Apple+pie");
/// assert_eq!(params.get("page"), Some(&"2".to_string()));
/// assert_eq!(params.get("title"), Some(&"Apple pie".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&').filter(|p| !p.is_empty()) {
            match param.split_once('=') {
                Some((key, encoded_value)) => {
                    params.insert(decode(key), decode(encoded_value));
                }
                // Flag parameter without value
                None => {
                    params.insert(decode(param), String::new());
                }
            }
        }
    }

    params
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Get a string parameter, empty when absent
pub fn get_string(params: &HashMap<String, String>, key: &str) -> String {
    params.get(key).cloned().unwrap_or_default()
}

/// A flag is set when the key is present with any non-empty value (e.g. `?images_only=1`)
pub fn get_flag(params: &HashMap<String, String>, key: &str) -> bool {
    params.get(key).map(|v| !v.is_empty()).unwrap_or(false)
}
