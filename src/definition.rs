//! Read-only accessors over an OpenAPI document: paths, servers, operations.

use serde_json::{Map, Value};

/// Path item keys that hold operations.
pub const HTTP_METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// A server entry. Documents without `servers` get a single `/` server.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Server {
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Base URL, possibly relative.
    pub url: String,
}

/// One operation of one path.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint<'a> {
    /// Upper-case HTTP method.
    pub method: String,
    /// The operation object, unresolved.
    pub operation: &'a Value,
    /// Path template such as `/pets/{petId}`.
    pub path: &'a str,
}

impl Endpoint<'_> {
    /// The operation's `summary`, if it has one.
    pub fn summary(&self) -> Option<&str> {
        return self.operation.get("summary").and_then(Value::as_str);
    }
}

/// Borrowing view over a document root.
#[derive(Debug, Clone, Copy)]
pub struct Definition<'a> {
    /// The document.
    root: &'a Value,
}

impl<'a> Definition<'a> {
    /// Wrap a document root.
    pub const fn new(root: &'a Value) -> Self {
        return Self { root };
    }

    /// The `paths` object, or `None` if the document has none.
    pub fn paths(&self) -> Option<&'a Map<String, Value>> {
        return self.root.get("paths").and_then(Value::as_object);
    }

    /// Declared servers, falling back to a single relative root server.
    /// Entries without a string `url` are skipped.
    pub fn servers(&self) -> Vec<Server> {
        let declared: Vec<Server> = self
            .root
            .get("servers")
            .and_then(Value::as_array)
            .map(|items| {
                return items
                    .iter()
                    .filter_map(|item| return serde_json::from_value(item.clone()).ok())
                    .collect();
            })
            .unwrap_or_default();

        if declared.is_empty() {
            return vec![Server { description: None, url: "/".to_string() }];
        }
        return declared;
    }

    /// The path item for an exact path template.
    pub fn path_item(&self, path: &str) -> Option<&'a Value> {
        return self.paths().and_then(|paths| return paths.get(path));
    }

    /// The operation for `method` under `path`. The method is case-insensitive.
    pub fn operation(&self, path: &str, method: &str) -> Option<&'a Value> {
        let method = method.to_ascii_lowercase();
        if !HTTP_METHODS.contains(&method.as_str()) {
            return None;
        }
        return self.path_item(path).and_then(|item| return item.get(method.as_str()));
    }

    /// Path-level parameters followed by operation-level parameters.
    /// Entries may still be `$ref` objects; the caller resolves them.
    pub fn parameters(&self, path: &str, method: &str) -> Vec<&'a Value> {
        let path_params = self
            .path_item(path)
            .and_then(|item| return item.get("parameters"))
            .and_then(Value::as_array);
        let operation_params = self
            .operation(path, method)
            .and_then(|op| return op.get("parameters"))
            .and_then(Value::as_array);

        return path_params
            .into_iter()
            .chain(operation_params)
            .flatten()
            .collect();
    }

    /// Every operation in document order.
    pub fn endpoints(&self) -> Vec<Endpoint<'a>> {
        let Some(paths) = self.paths() else {
            return Vec::new();
        };

        let mut endpoints = Vec::new();
        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            for (key, operation) in item {
                if HTTP_METHODS.contains(&key.as_str()) && operation.is_object() {
                    endpoints.push(Endpoint {
                        method: key.to_ascii_uppercase(),
                        operation,
                        path: path.as_str(),
                    });
                }
            }
        }
        return endpoints;
    }
}
