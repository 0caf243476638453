use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

/// Code word → definition, loaded once from a JSON file and read-only
/// thereafter.
#[derive(Default)]
pub struct CryptonymMap {
    inner: RwLock<HashMap<String, String>>,
}

impl CryptonymMap {
    pub(super) fn replace_from(&self, map: HashMap<String, String>) {
        *self.inner.write().expect("cryptonym map poisoned") = map;
    }

    /// All cryptonyms whose literal substring appears (case-sensitive) in
    /// `text`.
    pub fn matches_in(&self, text: &str) -> Vec<String> {
        self.inner
            .read()
            .expect("cryptonym map poisoned")
            .keys()
            .filter(|word| text.contains(word.as_str()))
            .cloned()
            .collect()
    }
}

pub(super) async fn load(path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let contents = tokio::fs::read_to_string(path).await?;
    let map = serde_json::from_str(&contents)?;
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_literal_substrings_case_sensitively() {
        let map = CryptonymMap::default();
        map.replace_from(HashMap::from([
            ("QKENCHANT".to_string(), "a field agent".to_string()),
            ("ODEARLY".to_string(), "an informant".to_string()),
        ]));
        let hits = map.matches_in("cable references QKENCHANT and odearly in passing");
        assert_eq!(hits, vec!["QKENCHANT".to_string()]);
    }
}
