//! Heuristic discovery of semantically meaningful fields.
//!
//! Services name their columns freely (`CODIGO_NODO`, `Latitud`,
//! `coordenadax`, ...). The resolver maps each [`Role`] to the field that
//! plays it, driven entirely by a [`CandidateTable`]: supporting a new
//! naming convention means adding candidates, not code.
//!
//! Matching runs in two passes per role. The exact pass compares field
//! names case-insensitively against the candidates in priority order. The
//! fallback pass strips diacritics, lower-cases both sides and accepts the
//! first field whose name contains a candidate, or is a piece of at least
//! three characters of one. Fields
//! are scanned in sorted name order and each field serves at most one role,
//! so the result depends only on the set of fields and the table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Semantic roles a field may play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Stable record identifier.
    Identifier,
    /// Latitude in decimal degrees.
    Latitude,
    /// Longitude in decimal degrees.
    Longitude,
    /// Human-readable location description.
    Label,
}

impl Role {
    /// Every role in resolution priority order.
    pub const ALL: [Self; 4] = [
        Self::Identifier,
        Self::Latitude,
        Self::Longitude,
        Self::Label,
    ];

    const fn is_coordinate(self) -> bool {
        matches!(self, Self::Latitude | Self::Longitude)
    }
}

/// Ordered candidate names for each role.
///
/// Roles are resolved in insertion order; within a role earlier candidates
/// win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTable {
    entries: Vec<(Role, Vec<String>)>,
}

impl Default for CandidateTable {
    fn default() -> Self {
        Self::empty()
            .with_role(
                Role::Identifier,
                [
                    "codigo_nodo",
                    "id_nodo",
                    "nodo",
                    "id_estacion",
                    "estacion",
                    "objectid",
                    "fid",
                ],
            )
            .with_role(
                Role::Latitude,
                ["coordenaday", "latitud", "lat", "latitude"],
            )
            .with_role(
                Role::Longitude,
                ["coordenadax", "longitud", "lon", "lng", "longitude"],
            )
            .with_role(
                Role::Label,
                [
                    "interseccion",
                    "via_principal",
                    "via_secundaria",
                    "direccion",
                    "direccion_nodo",
                    "ubicacion",
                    "nombre",
                    "name",
                ],
            )
    }
}

impl CandidateTable {
    /// Create a table without any roles.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Set the candidates for `role`, replacing any previous list.
    ///
    /// A role that is new to the table is appended after existing roles.
    #[must_use]
    pub fn with_role<I, S>(mut self, role: Role, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<String> = candidates.into_iter().map(Into::into).collect();
        match self.entries.iter_mut().find(|(existing, _)| *existing == role) {
            Some((_, slot)) => *slot = list,
            None => self.entries.push((role, list)),
        }
        self
    }

    /// Apply per-role overrides, typically read from configuration.
    #[must_use]
    pub fn with_overrides(self, overrides: &BTreeMap<Role, Vec<String>>) -> Self {
        overrides
            .iter()
            .fold(self, |table, (role, list)| table.with_role(*role, list.clone()))
    }

    /// Place a source-declared field name ahead of the generic candidates.
    #[must_use]
    pub fn with_hint(mut self, role: Role, hint: Option<&str>) -> Self {
        let Some(hint) = hint.map(str::trim).filter(|hint| !hint.is_empty()) else {
            return self;
        };
        match self.entries.iter_mut().find(|(existing, _)| *existing == role) {
            Some((_, list)) => {
                list.retain(|candidate| !candidate.eq_ignore_ascii_case(hint));
                list.insert(0, hint.to_owned());
            }
            None => self.entries.push((role, vec![hint.to_owned()])),
        }
        self
    }

    /// Candidates registered for `role`, highest priority first.
    #[must_use]
    pub fn candidates(&self, role: Role) -> &[String] {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == role)
            .map_or(&[], |(_, list)| list.as_slice())
    }

    fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.entries.iter().map(|(role, _)| *role)
    }
}

/// Role-to-field mapping produced by [`resolve_fields`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldResolution {
    fields: BTreeMap<Role, String>,
}

impl FieldResolution {
    /// Field resolved for `role`, if any.
    #[must_use]
    pub fn field(&self, role: Role) -> Option<&str> {
        self.fields.get(&role).map(String::as_str)
    }

    /// Whether both coordinate roles resolved.
    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        self.field(Role::Latitude).is_some() && self.field(Role::Longitude).is_some()
    }

    /// Roles that did not resolve to any field.
    #[must_use]
    pub fn unresolved(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| !self.fields.contains_key(role))
            .collect()
    }
}

/// Shortest field name the fallback accepts as part of a candidate.
const MIN_CONTAINED_LEN: usize = 3;

struct FieldName<'a> {
    original: &'a str,
    folded: String,
    numeric: bool,
}

/// Resolve which field of `sample` plays each role listed in `table`.
///
/// # Examples
///
/// ```
/// use nodeharvest_core::{CandidateTable, Role, resolve_fields};
/// use serde_json::json;
///
/// let sample = json!({ "CODIGO_NODO": "N-1", "Latitud": 4.65, "LONGITUD": -74.08 });
/// let resolution = resolve_fields(
///     sample.as_object().expect("object"),
///     &CandidateTable::default(),
/// );
/// assert_eq!(resolution.field(Role::Identifier), Some("CODIGO_NODO"));
/// assert_eq!(resolution.field(Role::Latitude), Some("Latitud"));
/// assert_eq!(resolution.field(Role::Longitude), Some("LONGITUD"));
/// assert_eq!(resolution.field(Role::Label), None);
/// ```
#[must_use]
pub fn resolve_fields(sample: &Map<String, Value>, table: &CandidateTable) -> FieldResolution {
    resolve_entries(
        sample.iter().map(|(name, value)| (name.as_str(), value)),
        table,
    )
}

fn resolve_entries<'a, I>(fields: I, table: &CandidateTable) -> FieldResolution
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut names: Vec<FieldName<'a>> = fields
        .into_iter()
        .map(|(name, value)| FieldName {
            original: name,
            folded: fold(name),
            numeric: is_numeric(value),
        })
        .collect();
    names.sort_by(|left, right| left.original.cmp(right.original));

    let mut resolution = FieldResolution::default();
    for role in table.roles() {
        if resolution.fields.contains_key(&role) {
            continue;
        }
        let claimed: Vec<&str> = resolution.fields.values().map(String::as_str).collect();
        let available: Vec<&FieldName<'_>> = names
            .iter()
            .filter(|name| !claimed.contains(&name.original))
            .collect();
        let candidates = table.candidates(role);
        let found = exact_match(&available, candidates)
            .or_else(|| substring_match(&available, candidates, role.is_coordinate()));
        if let Some(field) = found {
            resolution.fields.insert(role, field.to_owned());
        }
    }
    resolution
}

fn exact_match<'a>(available: &[&FieldName<'a>], candidates: &[String]) -> Option<&'a str> {
    candidates.iter().find_map(|candidate| {
        available
            .iter()
            .find(|name| name.original.to_lowercase() == candidate.to_lowercase())
            .map(|name| name.original)
    })
}

fn substring_match<'a>(
    available: &[&FieldName<'a>],
    candidates: &[String],
    numeric_only: bool,
) -> Option<&'a str> {
    candidates.iter().find_map(|candidate| {
        let folded_candidate = fold(candidate);
        if folded_candidate.is_empty() {
            return None;
        }
        available
            .iter()
            .filter(|name| !numeric_only || name.numeric)
            .find(|name| {
                name.folded.contains(&folded_candidate)
                    || (name.folded.chars().count() >= MIN_CONTAINED_LEN
                        && folded_candidate.contains(&name.folded))
            })
            .map(|name| name.original)
    })
}

/// Lower-case `text` and strip the diacritics used in Spanish field names.
#[must_use]
pub fn fold(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .map(|ch| match ch {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(text) => text.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn table() -> CandidateTable {
        CandidateTable::default()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[rstest]
    fn exact_matches_ignore_case(table: CandidateTable) {
        let sample = object(json!({
            "ESTACION": "E-7",
            "LATITUDE": 4.6,
            "Longitude": -74.1,
            "NOMBRE": "Calle 26",
        }));
        let resolution = resolve_fields(&sample, &table);
        assert_eq!(resolution.field(Role::Identifier), Some("ESTACION"));
        assert_eq!(resolution.field(Role::Latitude), Some("LATITUDE"));
        assert_eq!(resolution.field(Role::Longitude), Some("Longitude"));
        assert_eq!(resolution.field(Role::Label), Some("NOMBRE"));
        assert!(resolution.unresolved().is_empty());
    }

    #[rstest]
    fn substring_fallback_strips_diacritics(table: CandidateTable) {
        let sample = object(json!({
            "Intersección_Principal": "AK 45 X CL 245",
            "latitud_wgs84": "4.71",
            "longitud_wgs84": "-74.05",
        }));
        let resolution = resolve_fields(&sample, &table);
        assert_eq!(resolution.field(Role::Latitude), Some("latitud_wgs84"));
        assert_eq!(resolution.field(Role::Longitude), Some("longitud_wgs84"));
        assert_eq!(resolution.field(Role::Label), Some("Intersección_Principal"));
        assert_eq!(resolution.field(Role::Identifier), None);
    }

    #[rstest]
    fn coordinate_fallback_requires_numeric_samples(table: CandidateTable) {
        let sample = object(json!({
            "latitud_texto": "norte",
            "longitud_texto": "oeste",
        }));
        let resolution = resolve_fields(&sample, &table);
        assert!(!resolution.has_coordinates());
    }

    #[rstest]
    fn very_short_field_names_do_not_claim_roles(table: CandidateTable) {
        let sample = object(json!({ "a": "N-1", "o": 7, "no": "Cra 7" }));
        let resolution = resolve_fields(&sample, &table);
        assert_eq!(resolution.field(Role::Identifier), None);
        assert_eq!(resolution.field(Role::Label), None);
    }

    #[rstest]
    fn short_fragments_of_a_candidate_still_match(table: CandidateTable) {
        let sample = object(json!({ "nod": "N-1" }));
        let resolution = resolve_fields(&sample, &table);
        assert_eq!(resolution.field(Role::Identifier), Some("nod"));
    }

    #[rstest]
    fn hints_take_priority(table: CandidateTable) {
        let sample = object(json!({ "OBJECTID": 3, "SITE_CODE": "S-9" }));
        let hinted = table.with_hint(Role::Identifier, Some("site_code"));
        let resolution = resolve_fields(&sample, &hinted);
        assert_eq!(resolution.field(Role::Identifier), Some("SITE_CODE"));
    }

    #[rstest]
    fn a_field_serves_only_one_role() {
        let table = CandidateTable::empty()
            .with_role(Role::Identifier, ["nodo"])
            .with_role(Role::Label, ["nodo", "nombre"]);
        let sample = object(json!({ "nodo": "N-1", "nombre": "Cra 7" }));
        let resolution = resolve_fields(&sample, &table);
        assert_eq!(resolution.field(Role::Identifier), Some("nodo"));
        assert_eq!(resolution.field(Role::Label), Some("nombre"));
    }

    #[rstest]
    fn overrides_replace_role_candidates(table: CandidateTable) {
        let overrides = BTreeMap::from([(Role::Label, vec!["sitio".to_owned()])]);
        let table = table.with_overrides(&overrides);
        assert_eq!(table.candidates(Role::Label), ["sitio".to_owned()]);
        assert_eq!(table.candidates(Role::Latitude).first().map(String::as_str), Some("coordenaday"));
    }

    #[rstest]
    #[case("Dirección", "direccion")]
    #[case("  AÑO ", "ano")]
    #[case("Ubicación_Vía", "ubicacion_via")]
    fn fold_normalises_names(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(fold(input), expected);
    }
}
