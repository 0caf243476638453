use std::collections::HashSet;
use std::path::Path;
use std::sync::RwLock;

use crate::model::LocationKind;

/// Three independent name sets — city, state, country — loaded once from a
/// single pipe-delimited file of `kind|name` rows.
#[derive(Default)]
pub struct LocationMaps {
    cities: RwLock<HashSet<String>>,
    states: RwLock<HashSet<String>>,
    countries: RwLock<HashSet<String>>,
}

pub(super) struct Loaded {
    pub cities: HashSet<String>,
    pub states: HashSet<String>,
    pub countries: HashSet<String>,
}

impl LocationMaps {
    pub(super) fn replace_from(&self, loaded: Loaded) {
        *self.cities.write().expect("city map poisoned") = loaded.cities;
        *self.states.write().expect("state map poisoned") = loaded.states;
        *self.countries.write().expect("country map poisoned") = loaded.countries;
    }

    /// Look a single whitespace-delimited token up against all three maps;
    /// a token may match more than one kind.
    pub fn lookup(&self, token: &str) -> Vec<LocationKind> {
        let mut hits = Vec::new();
        if self.cities.read().expect("city map poisoned").contains(token) {
            hits.push(LocationKind::City);
        }
        if self.states.read().expect("state map poisoned").contains(token) {
            hits.push(LocationKind::State);
        }
        if self.countries.read().expect("country map poisoned").contains(token) {
            hits.push(LocationKind::Country);
        }
        hits
    }
}

pub(super) async fn load(path: &Path) -> anyhow::Result<Loaded> {
    let contents = tokio::fs::read_to_string(path).await?;
    let mut loaded = Loaded {
        cities: HashSet::new(),
        states: HashSet::new(),
        countries: HashSet::new(),
    };

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((kind, name)) = line.split_once('|') else {
            continue;
        };
        match kind.trim().to_ascii_lowercase().as_str() {
            "city" => {
                loaded.cities.insert(name.trim().to_string());
            }
            "state" => {
                loaded.states.insert(name.trim().to_string());
            }
            "country" => {
                loaded.countries.insert(name.trim().to_string());
            }
            _ => {}
        }
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_can_match_multiple_kinds() {
        let maps = LocationMaps::default();
        maps.replace_from(Loaded {
            cities: HashSet::from(["Georgia".to_string()]),
            states: HashSet::from(["Georgia".to_string()]),
            countries: HashSet::new(),
        });
        let hits = maps.lookup("Georgia");
        assert_eq!(hits.len(), 2);
    }
}
