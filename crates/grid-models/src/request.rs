use std::fmt;
use std::ops::Deref;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The member of a changed record (and of a projected one) that carries its identifier.
pub const RECID: &str = "recid";

/// The command a grid request carries in its `cmd` member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Command {
    GetRecords,
    SaveRecords,
    DeleteRecords,
    /// Any other token. Never dispatched.
    Other(String),
}

impl Command {
    pub fn as_str(&self) -> &str {
        match self {
            Command::GetRecords => "get-records",
            Command::SaveRecords => "save-records",
            Command::DeleteRecords => "delete-records",
            Command::Other(other) => other,
        }
    }
}

impl From<String> for Command {
    fn from(value: String) -> Self {
        match value.as_str() {
            "get-records" => Command::GetRecords,
            "save-records" => Command::SaveRecords,
            "delete-records" => Command::DeleteRecords,
            _ => Command::Other(value),
        }
    }
}

impl From<Command> for String {
    fn from(value: Command) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The request body a grid sends. Every member is caller-supplied and untrusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRequest {
    pub cmd: Command,
    #[serde(default, with = "numeric")]
    pub limit: Option<u32>,
    #[serde(default, with = "numeric")]
    pub offset: Option<u32>,
    #[serde(default)]
    pub sort: Entries<SortSpec>,
    #[serde(default)]
    pub search: Entries<SearchSpec>,
    /// The connective between search fragments, `AND` or `OR`.
    #[serde(default, deserialize_with = "string_or_none")]
    pub search_logic: Option<String>,
    /// One object per changed record, each carrying its `recid`.
    #[serde(default)]
    pub changes: Entries<serde_json::Map<String, Value>>,
    /// Identifiers of the records to delete.
    #[serde(default)]
    pub selected: Entries<Value>,
}

impl GridRequest {
    /// An otherwise empty request for the given command.
    pub fn new(cmd: Command) -> Self {
        GridRequest {
            cmd,
            limit: None,
            offset: None,
            sort: Entries::default(),
            search: Entries::default(),
            search_logic: None,
            changes: Entries::default(),
            selected: Entries::default(),
        }
    }
}

/// One sort descriptor. Members are optional so that malformed descriptors
/// can be skipped rather than rejecting the whole request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    #[serde(default, deserialize_with = "string_or_none")]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub direction: Option<String>,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: impl Into<String>) -> Self {
        SortSpec {
            field: Some(field.into()),
            direction: Some(direction.into()),
        }
    }
}

/// One search descriptor. The shape of `value` depends on the operator:
/// a scalar, a two element range or a list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchSpec {
    #[serde(default, deserialize_with = "string_or_none")]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub r#type: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub operator: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

impl SearchSpec {
    pub fn new(
        field: impl Into<String>,
        r#type: impl Into<String>,
        operator: impl Into<String>,
        value: Value,
    ) -> Self {
        SearchSpec {
            field: Some(field.into()),
            r#type: Some(r#type.into()),
            operator: Some(operator.into()),
            value: Some(value),
        }
    }
}

/// A sequence of request entries. Grids send these either as a JSON array or
/// as an object keyed by opaque indices (`{"0": .., "1": ..}`); both are
/// accepted and the document order is kept. Entries that do not have the
/// shape of `T` are dropped, as is a member of any other shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entries<T>(pub Vec<T>);

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Entries(Vec::new())
    }
}

impl<T> Deref for Entries<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> From<Vec<T>> for Entries<T> {
    fn from(value: Vec<T>) -> Self {
        Entries(value)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Entries<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            List(Vec<Value>),
            Keyed(IndexMap<String, Value>),
            Other(Value),
        }

        let items = match Option::<Repr>::deserialize(deserializer)? {
            Some(Repr::List(items)) => items,
            Some(Repr::Keyed(items)) => items.into_values().collect(),
            None | Some(Repr::Other(_)) => Vec::new(),
        };
        Ok(Entries(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ))
    }
}

/// A string member; any other JSON value reads as absent.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(Some(value)),
        _ => Ok(None),
    }
}

/// Paging members arrive as numbers from JSON clients and as strings from
/// form-encoded ones.
mod numeric {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<NumberOrString>::deserialize(deserializer)? {
            None => Ok(None),
            Some(NumberOrString::Number(number)) => u32::try_from(number)
                .map(Some)
                .map_err(serde::de::Error::custom),
            Some(NumberOrString::String(string)) if string.trim().is_empty() => Ok(None),
            Some(NumberOrString::String(string)) => string
                .trim()
                .parse()
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use similar_asserts::assert_eq;

    #[test]
    fn parses_a_json_read_request() {
        let request: GridRequest = serde_json::from_value(json!({
            "cmd": "get-records",
            "limit": 10,
            "offset": 20,
            "sort": [{"field": "users__name", "direction": "asc"}],
            "search": [{"field": "users__age", "type": "int", "operator": "is", "value": 3}],
            "searchLogic": "OR"
        }))
        .unwrap();

        assert_eq!(request.cmd, Command::GetRecords);
        assert_eq!(request.limit, Some(10));
        assert_eq!(request.offset, Some(20));
        assert_eq!(request.sort.to_vec(), vec![SortSpec::new("users__name", "asc")]);
        assert_eq!(
            request.search.to_vec(),
            vec![SearchSpec::new("users__age", "int", "is", json!(3))]
        );
        assert_eq!(request.search_logic.as_deref(), Some("OR"));
    }

    #[test]
    fn parses_form_style_keyed_entries_in_document_order() {
        let request: GridRequest = serde_json::from_value(json!({
            "cmd": "delete-records",
            "limit": "50",
            "offset": "",
            "selected": {"1": 7, "0": 3},
            "sort": null
        }))
        .unwrap();

        assert_eq!(request.limit, Some(50));
        assert_eq!(request.offset, None);
        assert_eq!(request.selected.to_vec(), vec![json!(7), json!(3)]);
        assert!(request.sort.is_empty());
    }

    #[test]
    fn keeps_malformed_specs_for_later_skipping() {
        let request: GridRequest = serde_json::from_value(json!({
            "cmd": "get-records",
            "sort": [{"direction": "asc"}]
        }))
        .unwrap();

        assert_eq!(
            request.sort.to_vec(),
            vec![SortSpec {
                field: None,
                direction: Some("asc".to_string())
            }]
        );
    }

    #[test]
    fn entries_of_the_wrong_shape_are_dropped() {
        let request: GridRequest = serde_json::from_value(json!({
            "cmd": "get-records",
            "sort": [{"field": "users__name", "direction": "desc"}, "users__id"],
            "search": {
                "0": {"field": 5, "type": "text", "operator": "is", "value": "Ada"},
                "1": "users__age",
                "2": {"field": "users__age", "type": "int", "operator": "is", "value": 3}
            },
            "searchLogic": 1,
            "changes": [{"recid": 1, "users__name": "Ada"}, 7],
            "selected": "everything"
        }))
        .unwrap();

        assert_eq!(request.sort.to_vec(), vec![SortSpec::new("users__name", "desc")]);
        assert_eq!(
            request.search.to_vec(),
            vec![
                SearchSpec {
                    field: None,
                    r#type: Some("text".to_string()),
                    operator: Some("is".to_string()),
                    value: Some(json!("Ada")),
                },
                SearchSpec::new("users__age", "int", "is", json!(3)),
            ]
        );
        assert_eq!(request.search_logic, None);
        assert_eq!(request.changes.len(), 1);
        assert!(request.selected.is_empty());
    }

    #[test]
    fn unknown_commands_are_kept_verbatim() {
        let request: GridRequest =
            serde_json::from_value(json!({"cmd": "drop-table"})).unwrap();
        assert_eq!(request.cmd, Command::Other("drop-table".to_string()));
        assert_eq!(request.cmd.to_string(), "drop-table");
    }

    #[test]
    fn negative_paging_is_rejected() {
        let result =
            serde_json::from_value::<GridRequest>(json!({"cmd": "get-records", "limit": -1}));
        assert!(result.is_err());
    }
}
