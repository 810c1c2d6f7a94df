// Case-insensitive query/form parameter parsing (spec §6: "Query and form
// parameter keys are matched case-insensitively"), ported from
// `original_source/uws/dependencies.py`'s `uws_params_dependency`: query
// params are always present, form params are appended only on POST, and both
// preserve insertion order and duplicate keys.

use uws_core::domain::JobParameter;

fn lowercased_pairs(raw: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect()
}

/// Query-string pairs only, lowercased.
pub fn query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    lowercased_pairs(query.unwrap_or(""))
}

/// Query pairs plus a POST form body's pairs, in that order, each tagged with
/// whether it came from the form body (`is_post`).
pub fn all_pairs(query: Option<&str>, form_body: Option<&str>) -> Vec<JobParameter> {
    let mut params: Vec<JobParameter> = query_pairs(query)
        .into_iter()
        .map(|(k, v)| JobParameter::new(k, v, false))
        .collect();
    if let Some(body) = form_body {
        params.extend(
            lowercased_pairs(body)
                .into_iter()
                .map(|(k, v)| JobParameter::new(k, v, true)),
        );
    }
    params
}

/// Pull the single value for `key` out of `params`, case-insensitively
/// (`key` must already be lowercase). Used by the single-field POST routes
/// (`destruction`, `executionduration`, `phase`) which reject any other key.
pub fn single_value<'a>(params: &'a [JobParameter], key: &str) -> Result<Option<&'a str>, String> {
    let mut found = None;
    for param in params {
        if param.id != key {
            return Err(format!("Unknown parameter {}={}", param.id, param.value));
        }
        found = Some(param.value.as_str());
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_keys_are_lowercased() {
        let pairs = query_pairs(Some("ID=abc&Pos=RANGE"));
        assert_eq!(pairs, vec![("id".to_string(), "abc".to_string()), ("pos".to_string(), "RANGE".to_string())]);
    }

    #[test]
    fn form_params_follow_query_params_and_are_marked_post() {
        let params = all_pairs(Some("ID=abc"), Some("RunId=xyz"));
        assert_eq!(params.len(), 2);
        assert!(!params[0].is_post);
        assert_eq!(params[0].id, "id");
        assert!(params[1].is_post);
        assert_eq!(params[1].id, "runid");
    }

    #[test]
    fn single_value_rejects_unexpected_keys() {
        let params = vec![JobParameter::new("bogus", "x", true)];
        assert!(single_value(&params, "destruction").is_err());
    }
}
