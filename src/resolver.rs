//! Local `$ref` resolution with memoization, cycle detection, and a depth bound.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::Error;
use crate::pointer;
use crate::types::{NodeKind, ROOT_POINTER};

/// Maximum resolution stack length before `DepthExceeded`.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Resolves pointers against one document.
///
/// State lives behind `RefCell`/`Cell` so nested expansion can call back into
/// `resolve` through `&self`. That also makes the resolver `!Sync`: one
/// instance belongs to one document on one thread.
#[derive(Debug)]
pub struct Resolver {
    /// Fully expanded values by pointer. Write-once, never evicted.
    cache: RefCell<HashMap<String, Value>>,
    /// Largest stack length that may still push another pointer.
    max_depth: usize,
    /// The document. Never mutated.
    root: Value,
    /// Pointers whose resolution is in progress, outermost first.
    stack: RefCell<Vec<String>>,
    /// Number of document walks performed.
    traversals: Cell<usize>,
}

/// Holds one entry on the resolution stack and pops it on drop, including
/// when resolution returns early with an error.
struct StackFrame<'a> {
    /// The stack this frame was pushed onto.
    stack: &'a RefCell<Vec<String>>,
}

impl<'a> StackFrame<'a> {
    /// Push `pointer` and return the guard that will pop it.
    fn enter(stack: &'a RefCell<Vec<String>>, pointer: &str) -> Self {
        stack.borrow_mut().push(pointer.to_string());
        return Self { stack };
    }
}

impl Drop for StackFrame<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

impl Resolver {
    /// Create a resolver with the default depth bound.
    pub fn new(root: Value) -> Self {
        return Self::with_max_depth(root, DEFAULT_MAX_DEPTH);
    }

    /// Create a resolver with a custom depth bound.
    pub fn with_max_depth(root: Value, max_depth: usize) -> Self {
        return Self {
            cache: RefCell::new(HashMap::new()),
            max_depth,
            root,
            stack: RefCell::new(Vec::new()),
            traversals: Cell::new(0),
        };
    }

    /// The document this resolver reads from.
    pub const fn root(&self) -> &Value {
        return &self.root;
    }

    /// The configured depth bound.
    pub const fn max_depth(&self) -> usize {
        return self.max_depth;
    }

    /// How many times the document has been walked. Cache hits do not count.
    pub fn traversal_count(&self) -> usize {
        return self.traversals.get();
    }

    /// Number of memoized pointers.
    pub fn cached_len(&self) -> usize {
        return self.cache.borrow().len();
    }

    /// Current resolution stack length. Zero whenever no `resolve` call is running.
    pub fn in_progress(&self) -> usize {
        return self.stack.borrow().len();
    }

    /// Resolve a local pointer to its fully expanded value.
    ///
    /// # Errors
    ///
    /// Returns `Error::CircularReference` if the pointer is already being resolved,
    /// `Error::DepthExceeded` if the stack is longer than the depth bound,
    /// `Error::UnsupportedReferenceKind` if the pointer does not start with `#/`,
    /// or `Error::PointerResolutionFailure` if a segment is missing. Errors from
    /// nested references propagate unchanged.
    pub fn resolve(&self, pointer: &str) -> Result<Value, Error> {
        self.refuse_cycle(pointer)?;

        let depth = self.in_progress();
        if depth > self.max_depth {
            return Err(Error::DepthExceeded {
                depth,
                max_depth: self.max_depth,
                pointer: pointer.to_string(),
            });
        }

        if let Some(hit) = self.cache.borrow().get(pointer) {
            trace!(pointer, "cache hit");
            return Ok(hit.clone());
        }

        let decoded = pointer::decode(pointer);
        if !decoded.prefix_valid {
            return Err(Error::UnsupportedReferenceKind { pointer: pointer.to_string() });
        }

        let _frame = StackFrame::enter(&self.stack, pointer);
        debug!(pointer, depth, "resolving");

        self.traversals.set(self.traversals.get().saturating_add(1));
        let raw = pointer::walk(&self.root, pointer, &decoded.segments)?;
        let expanded = self.expand(raw)?;

        self.cache.borrow_mut().insert(pointer.to_string(), expanded.clone());
        return Ok(expanded);
    }

    /// Resolve the whole document, expanding every reachable reference.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error encountered in document order.
    pub fn resolve_document(&self) -> Result<Value, Error> {
        return self.resolve(ROOT_POINTER);
    }

    /// Expand every reference inside `node`, which need not belong to the document.
    ///
    /// # Errors
    ///
    /// Returns any error from resolving a nested reference.
    pub fn expand(&self, node: &Value) -> Result<Value, Error> {
        return match NodeKind::classify(node) {
            NodeKind::Scalar(value) => Ok(value.clone()),
            NodeKind::Array(items) => {
                let expanded = items
                    .iter()
                    .map(|item| return self.expand(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(expanded))
            },
            NodeKind::Object(map) => {
                let mut expanded = Map::with_capacity(map.len());
                for (key, value) in map {
                    expanded.insert(key.clone(), self.expand(value)?);
                }
                Ok(Value::Object(expanded))
            },
            NodeKind::Reference { overrides, pointer } => {
                let target = self.resolve(pointer)?;
                self.apply_overrides(pointer, target, &overrides)
            },
        };
    }

    /// Overlay sibling keys on a resolved target. Shallow: a sibling replaces
    /// the whole same-named field. Existing keys keep their position.
    ///
    /// A target that is not an object has no fields to start from, so the
    /// result holds only the siblings.
    ///
    /// # Errors
    ///
    /// Returns any error from expanding an override value.
    fn apply_overrides(
        &self,
        pointer: &str,
        target: Value,
        overrides: &[(&str, &Value)],
    ) -> Result<Value, Error> {
        if overrides.is_empty() {
            return Ok(target);
        }

        let mut merged = match target {
            Value::Object(map) => map,
            other => {
                debug!(
                    pointer,
                    replaced = %other,
                    "reference target is not an object, keeping sibling keys only"
                );
                Map::with_capacity(overrides.len())
            },
        };

        for (key, value) in overrides {
            merged.insert((*key).to_string(), self.expand(value)?);
        }
        return Ok(Value::Object(merged));
    }

    /// Fail if `pointer` is already on the stack.
    ///
    /// # Errors
    ///
    /// Returns `Error::CircularReference` with the stack plus `pointer` as the chain.
    fn refuse_cycle(&self, pointer: &str) -> Result<(), Error> {
        let stack = self.stack.borrow();
        if !stack.iter().any(|p| return p == pointer) {
            return Ok(());
        }

        let mut chain = stack.clone();
        chain.push(pointer.to_string());
        return Err(Error::CircularReference { chain });
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    /// The classic pet store shape: allOf composition plus a nested ref.
    fn pet_store() -> Value {
        return json!({
            "openapi": "3.0.0",
            "components": {
                "schemas": {
                    "BaseEntity": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "created_at": { "type": "string", "format": "date-time" }
                        }
                    },
                    "Pet": {
                        "allOf": [
                            { "$ref": "#/components/schemas/BaseEntity" },
                            {
                                "type": "object",
                                "properties": {
                                    "name": { "type": "string" },
                                    "tag": { "$ref": "#/components/schemas/Tag" }
                                }
                            }
                        ]
                    },
                    "Tag": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "name": { "type": "string" }
                        }
                    }
                }
            }
        });
    }

    /// A chain `n0 -> n1 -> ... -> n{hops}` where the last node is a plain value.
    fn chain(hops: usize) -> Value {
        let mut nodes = Map::new();
        for i in 0..hops {
            nodes.insert(format!("n{i}"), json!({ "$ref": format!("#/nodes/n{}", i + 1) }));
        }
        nodes.insert(format!("n{hops}"), json!({ "end": true }));
        return json!({ "nodes": nodes });
    }

    #[test]
    fn expands_nested_references() {
        let resolver = Resolver::new(pet_store());
        let pet = resolver.resolve("#/components/schemas/Pet").unwrap();

        assert_eq!(pet["allOf"][0]["properties"]["created_at"]["format"], "date-time");
        assert_eq!(pet["allOf"][1]["properties"]["tag"]["properties"]["name"]["type"], "string");
        assert!(!pet.to_string().contains("$ref"), "no reference should survive: {pet}");
    }

    #[test]
    fn second_resolve_hits_cache() {
        let resolver = Resolver::new(pet_store());
        let first = resolver.resolve("#/components/schemas/Pet").unwrap();
        let walks = resolver.traversal_count();

        let second = resolver.resolve("#/components/schemas/Pet").unwrap();
        assert_eq!(first, second);
        assert_eq!(resolver.traversal_count(), walks);
    }

    #[test]
    fn nested_targets_are_memoized_too() {
        let resolver = Resolver::new(pet_store());
        resolver.resolve("#/components/schemas/Pet").unwrap();
        let walks = resolver.traversal_count();

        resolver.resolve("#/components/schemas/Tag").unwrap();
        assert_eq!(resolver.traversal_count(), walks);
        assert_eq!(resolver.cached_len(), 3);
    }

    #[test]
    fn detects_two_node_cycle() {
        let doc = json!({
            "components": { "schemas": {
                "A": { "type": "object", "properties": { "b": { "$ref": "#/components/schemas/B" } } },
                "B": { "type": "object", "properties": { "a": { "$ref": "#/components/schemas/A" } } }
            } }
        });
        let resolver = Resolver::new(doc);
        let err = resolver.resolve("#/components/schemas/A").unwrap_err();

        let Error::CircularReference { chain } = err else {
            panic!("expected CircularReference, got {err:?}");
        };
        assert_eq!(
            chain,
            vec!["#/components/schemas/A", "#/components/schemas/B", "#/components/schemas/A"]
        );
        assert_eq!(resolver.in_progress(), 0);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let resolver = Resolver::new(json!({ "Node": { "child": { "$ref": "#/Node" } } }));
        assert!(matches!(
            resolver.resolve("#/Node"),
            Err(Error::CircularReference { chain }) if chain == vec!["#/Node", "#/Node"]
        ));
    }

    #[test]
    fn chain_at_depth_bound_succeeds() {
        let resolver = Resolver::new(chain(DEFAULT_MAX_DEPTH));
        assert_eq!(resolver.resolve("#/nodes/n0").unwrap(), json!({ "end": true }));
    }

    #[test]
    fn chain_past_depth_bound_fails() {
        let resolver = Resolver::new(chain(DEFAULT_MAX_DEPTH + 1));
        let err = resolver.resolve("#/nodes/n0").unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { max_depth: DEFAULT_MAX_DEPTH, .. }), "{err:?}");
        assert_eq!(resolver.in_progress(), 0);
    }

    #[test]
    fn custom_depth_bound() {
        let resolver = Resolver::with_max_depth(chain(3), 2);
        assert_eq!(resolver.max_depth(), 2);
        assert!(matches!(resolver.resolve("#/nodes/n0"), Err(Error::DepthExceeded { .. })));
        assert_eq!(Resolver::new(json!({})).max_depth(), DEFAULT_MAX_DEPTH);
        assert_eq!(Resolver::with_max_depth(chain(3), 3).resolve("#/nodes/n0").unwrap()["end"], true);
    }

    #[test]
    fn escaped_segments() {
        let resolver = Resolver::new(json!({ "a/b": { "c~d": 42 } }));
        assert_eq!(resolver.resolve("#/a~1b/c~0d").unwrap(), json!(42));
    }

    #[test]
    fn siblings_override_target_fields() {
        let doc = json!({
            "X": { "id": 1, "name": "base" },
            "Y": { "$ref": "#/X", "name": "override" }
        });
        let resolver = Resolver::new(doc);
        let y = resolver.resolve("#/Y").unwrap();
        assert_eq!(y, json!({ "id": 1, "name": "override" }));
        // Key order follows the target, so the override stays in place.
        assert_eq!(y.as_object().unwrap().keys().collect::<Vec<_>>(), vec!["id", "name"]);
        // The cached target is untouched by the overlay.
        assert_eq!(resolver.resolve("#/X").unwrap(), json!({ "id": 1, "name": "base" }));
    }

    #[test]
    fn merge_is_shallow() {
        let doc = json!({
            "X": { "properties": { "id": { "type": "integer" }, "name": { "type": "string" } } },
            "Y": { "$ref": "#/X", "properties": { "name": { "type": "integer" } } }
        });
        let y = Resolver::new(doc).resolve("#/Y").unwrap();
        assert_eq!(y, json!({ "properties": { "name": { "type": "integer" } } }));
    }

    #[test]
    fn override_values_are_expanded() {
        let doc = json!({
            "Id": { "type": "integer" },
            "X": { "type": "object" },
            "Y": { "$ref": "#/X", "items": { "$ref": "#/Id" } }
        });
        let y = Resolver::new(doc).resolve("#/Y").unwrap();
        assert_eq!(y, json!({ "type": "object", "items": { "type": "integer" } }));
    }

    #[test]
    fn overrides_on_scalar_target_are_kept() {
        let doc = json!({
            "Null": null,
            "Name": "fido",
            "Flag": true,
            "Ids": [1, 2],
            "Id": { "type": "integer" },
            "A": { "$ref": "#/Null", "description": "x" },
            "B": { "$ref": "#/Name", "note": "kept" },
            "C": { "$ref": "#/Flag", "schema": { "$ref": "#/Id" } },
            "D": { "$ref": "#/Ids", "description": "list" }
        });
        let resolver = Resolver::new(doc);
        assert_eq!(resolver.resolve("#/A").unwrap(), json!({ "description": "x" }));
        assert_eq!(resolver.resolve("#/B").unwrap(), json!({ "note": "kept" }));
        assert_eq!(resolver.resolve("#/C").unwrap(), json!({ "schema": { "type": "integer" } }));
        assert_eq!(resolver.resolve("#/D").unwrap(), json!({ "description": "list" }));
    }

    #[test]
    fn scalar_target_without_overrides_is_returned_as_is() {
        let doc = json!({ "Name": "fido", "Ref": { "$ref": "#/Name" } });
        assert_eq!(Resolver::new(doc).resolve("#/Ref").unwrap(), json!("fido"));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let doc = json!({
            "C": { "type": "string", "maxLength": 8 },
            "A": { "properties": { "c": { "$ref": "#/C" } } },
            "B": { "items": { "$ref": "#/C" } },
            "Both": { "left": { "$ref": "#/A" }, "right": { "$ref": "#/B" } }
        });
        let resolver = Resolver::new(doc);
        let both = resolver.resolve("#/Both").unwrap();
        assert_eq!(both["left"]["properties"]["c"], both["right"]["items"]);
        assert_eq!(resolver.resolve("#/A").unwrap()["properties"]["c"], json!({ "type": "string", "maxLength": 8 }));
    }

    #[test]
    fn missing_segment_names_full_pointer() {
        let resolver = Resolver::new(pet_store());
        let err = resolver.resolve("#/components/schemas/DoesNotExist").unwrap_err();
        assert!(matches!(
            err,
            Error::PointerResolutionFailure { ref pointer, .. } if pointer == "#/components/schemas/DoesNotExist"
        ));
    }

    #[test]
    fn nested_missing_reference_propagates() {
        let doc = json!({ "A": { "items": { "$ref": "#/Gone" } } });
        let err = Resolver::new(doc).resolve("#/A").unwrap_err();
        assert!(matches!(err, Error::PointerResolutionFailure { ref pointer, .. } if pointer == "#/Gone"));
    }

    #[test]
    fn external_reference_is_unsupported() {
        let doc = json!({ "A": { "$ref": "common.yaml#/Pet" } });
        let resolver = Resolver::new(doc);
        assert!(matches!(
            resolver.resolve("common.yaml#/Pet"),
            Err(Error::UnsupportedReferenceKind { pointer }) if pointer == "common.yaml#/Pet"
        ));
        assert!(matches!(resolver.resolve("#/A"), Err(Error::UnsupportedReferenceKind { .. })));
    }

    #[test]
    fn empty_ref_is_copied_as_content() {
        let doc = json!({ "Blank": { "$ref": "", "title": "blank" } });
        let resolver = Resolver::new(doc);
        assert_eq!(resolver.resolve("#/Blank").unwrap(), json!({ "$ref": "", "title": "blank" }));
    }

    #[test]
    fn usable_after_failure() {
        let doc = json!({
            "Bad": { "wrapper": { "$ref": "#/Missing" } },
            "Good": { "$ref": "#/Target" },
            "Target": { "ok": true }
        });
        let resolver = Resolver::new(doc);
        assert!(resolver.resolve("#/Bad").is_err());
        assert_eq!(resolver.in_progress(), 0);
        assert_eq!(resolver.resolve("#/Good").unwrap(), json!({ "ok": true }));
        // A failed pointer is never cached.
        assert!(resolver.resolve("#/Bad").is_err());
    }

    #[test]
    fn root_is_left_untouched() {
        let doc = pet_store();
        let resolver = Resolver::new(doc.clone());
        resolver.resolve_document().unwrap();
        assert_eq!(resolver.root(), &doc);
    }

    #[test]
    fn root_pointer_resolves_whole_document() {
        let resolver = Resolver::new(pet_store());
        let doc = resolver.resolve_document().unwrap();
        assert_eq!(doc["openapi"], "3.0.0");
        assert_eq!(
            doc["components"]["schemas"]["Pet"]["allOf"][0],
            doc["components"]["schemas"]["BaseEntity"]
        );
    }

    #[test]
    fn reference_to_root_inside_document_is_a_cycle() {
        let resolver = Resolver::new(json!({ "self": { "$ref": "#/" } }));
        assert!(matches!(resolver.resolve_document(), Err(Error::CircularReference { .. })));
    }

    #[test]
    fn expand_arbitrary_node() {
        let resolver = Resolver::new(pet_store());
        let operation = json!({
            "responses": { "200": { "schema": { "$ref": "#/components/schemas/Tag" } } },
            "tags": ["pets"]
        });
        let expanded = resolver.expand(&operation).unwrap();
        assert_eq!(expanded["responses"]["200"]["schema"]["type"], "object");
        assert_eq!(expanded["tags"], json!(["pets"]));
    }

    #[test]
    fn array_elements_keep_order() {
        let doc = json!({ "One": 1, "List": [{ "$ref": "#/One" }, 2, { "$ref": "#/One" }] });
        assert_eq!(Resolver::new(doc).resolve("#/List").unwrap(), json!([1, 2, 1]));
    }
}
