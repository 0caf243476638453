use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;

/// Language name → set of lowercase words, loaded once from a directory of
/// per-language word-list files (one word per line, filename stem is the
/// language name).
#[derive(Default)]
pub struct Dictionaries {
    inner: RwLock<HashMap<String, HashSet<String>>>,
}

impl Dictionaries {
    pub(super) fn replace_from(&self, dicts: HashMap<String, HashSet<String>>) {
        *self.inner.write().expect("dictionaries poisoned") = dicts;
    }

    pub fn languages(&self) -> Vec<String> {
        self.inner.read().expect("dictionaries poisoned").keys().cloned().collect()
    }

    pub fn contains(&self, language: &str, word: &str) -> bool {
        self.inner
            .read()
            .expect("dictionaries poisoned")
            .get(language)
            .is_some_and(|set| set.contains(word))
    }
}

pub(super) async fn load_dir(dir: &Path) -> anyhow::Result<HashMap<String, HashSet<String>>> {
    let mut dicts = HashMap::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(language) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let contents = tokio::fs::read_to_string(&path).await?;
        let words: HashSet<String> = contents
            .lines()
            .map(|w| w.trim().to_ascii_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        dicts.insert(language.to_string(), words);
    }
    Ok(dicts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_case_folded() {
        let dicts = Dictionaries::default();
        dicts.replace_from(HashMap::from([(
            "english".to_string(),
            HashSet::from(["hello".to_string()]),
        )]));
        assert!(dicts.contains("english", "hello"));
        assert!(!dicts.contains("english", "goodbye"));
    }
}
