//! Endpoint parameter lists (query, path and header rows).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::diff::{PatchSet, changed_orders, order_map};
use crate::error::{DomainError, DomainResult};
use crate::order::{Ordered, Placement, insert, remove, reorder, sort_by_order};

/// Which parameter list a row lives in.
///
/// Rows of different shapes are persisted through different backend fields,
/// so moving a row across shapes is a remove plus a fresh add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamShape {
    /// `?key=value` parameters.
    Query,
    /// `/:key` parameters.
    Path,
    /// Request headers.
    Header,
}

/// One row of a parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamRow {
    /// Row id.
    pub id: String,
    /// Parameter name.
    pub name: String,
    /// Parameter value.
    #[serde(default)]
    pub value: JsonValue,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Disabled rows are kept but not sent.
    #[serde(default)]
    pub disabled: bool,
    /// Whether the row propagates to child resources.
    #[serde(default)]
    pub propagate: bool,
    /// 1-based order.
    pub order: u32,
}

impl ParamRow {
    /// Creates an enabled row with a string value.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: &str, order: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value: JsonValue::String(value.to_string()),
            description: None,
            disabled: false,
            propagate: false,
            order,
        }
    }

    /// Fresh add-payload built from the row's scalar fields.
    #[must_use]
    pub fn to_add_payload(&self) -> AddParam {
        AddParam {
            name: self.name.clone(),
            value: self.value.clone(),
            order: self.order,
            description: self.description.clone(),
            options: ParamOptions {
                disabled: self.disabled,
                propagate: self.propagate,
            },
        }
    }
}

impl Ordered for ParamRow {
    fn id(&self) -> &str {
        &self.id
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

/// Row flags carried by an add-payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamOptions {
    /// Disabled flag.
    pub disabled: bool,
    /// Propagate flag.
    pub propagate: bool,
}

/// A new parameter row, without identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddParam {
    /// Parameter name.
    pub name: String,
    /// Parameter value.
    pub value: JsonValue,
    /// Order in the destination list.
    pub order: u32,
    /// Optional description.
    #[serde(rename = "desc")]
    pub description: Option<String>,
    /// Flags.
    pub options: ParamOptions,
}

/// Per-shape patches carried by one resource update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamsPatch {
    /// Query parameter changes.
    pub query: PatchSet<AddParam>,
    /// Path parameter changes.
    pub path: PatchSet<AddParam>,
    /// Header changes.
    pub headers: PatchSet<AddParam>,
}

impl ParamsPatch {
    /// Patch for one shape.
    #[must_use]
    pub const fn shape(&self, shape: ParamShape) -> &PatchSet<AddParam> {
        match shape {
            ParamShape::Query => &self.query,
            ParamShape::Path => &self.path,
            ParamShape::Header => &self.headers,
        }
    }

    /// Mutable patch for one shape.
    pub const fn shape_mut(&mut self, shape: ParamShape) -> &mut PatchSet<AddParam> {
        match shape {
            ParamShape::Query => &mut self.query,
            ParamShape::Path => &mut self.path,
            ParamShape::Header => &mut self.headers,
        }
    }

    /// True when no shape has changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.path.is_empty() && self.headers.is_empty()
    }

    /// True when the backend will create rows, and so assign new ids.
    #[must_use]
    pub fn adds_rows(&self) -> bool {
        [&self.query, &self.path, &self.headers]
            .iter()
            .any(|patch| !patch.to_add.is_empty())
    }
}

/// All parameter lists of one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointParams {
    /// Query rows.
    #[serde(default)]
    pub query: Vec<ParamRow>,
    /// Path rows.
    #[serde(default)]
    pub path: Vec<ParamRow>,
    /// Header rows.
    #[serde(default)]
    pub headers: Vec<ParamRow>,
}

impl EndpointParams {
    /// Rows of one shape.
    #[must_use]
    pub fn list(&self, shape: ParamShape) -> &[ParamRow] {
        match shape {
            ParamShape::Query => &self.query,
            ParamShape::Path => &self.path,
            ParamShape::Header => &self.headers,
        }
    }

    /// Mutable rows of one shape.
    pub const fn list_mut(&mut self, shape: ParamShape) -> &mut Vec<ParamRow> {
        match shape {
            ParamShape::Query => &mut self.query,
            ParamShape::Path => &mut self.path,
            ParamShape::Header => &mut self.headers,
        }
    }

    /// Shape of the list holding `id`.
    #[must_use]
    pub fn shape_of(&self, id: &str) -> Option<ParamShape> {
        [ParamShape::Query, ParamShape::Path, ParamShape::Header]
            .into_iter()
            .find(|shape| self.list(*shape).iter().any(|row| row.id == id))
    }

    /// Sorts every list by order.
    pub fn sort(&mut self) {
        sort_by_order(&mut self.query);
        sort_by_order(&mut self.path);
        sort_by_order(&mut self.headers);
    }

    /// Reorders a row within its own list and returns the order patch.
    ///
    /// # Errors
    /// Returns `ItemNotFound` if the row or the target is not in `shape`.
    pub fn reorder_within(
        &mut self,
        shape: ParamShape,
        source_id: &str,
        placement: &Placement,
    ) -> DomainResult<ParamsPatch> {
        let list = self.list_mut(shape);
        let before = order_map(list);
        reorder(list, source_id, placement)?;

        let mut patch = ParamsPatch::default();
        patch.shape_mut(shape).to_update = changed_orders(&before, list);
        Ok(patch)
    }

    /// Moves a row from one shape to another.
    ///
    /// The source list loses the row and closes the gap; the destination
    /// receives a fresh add-payload built from the row's scalar fields at the
    /// placement-derived order, and its displaced rows are renumbered.
    ///
    /// # Errors
    /// Returns `ItemNotFound` if the row or the target is missing.
    pub fn move_across(
        &mut self,
        from: ParamShape,
        source_id: &str,
        to: ParamShape,
        placement: &Placement,
    ) -> DomainResult<ParamsPatch> {
        if from == to {
            return self.reorder_within(from, source_id, placement);
        }
        if let Placement::Edge { target_id, .. } = placement {
            if !self.list(to).iter().any(|row| &row.id == target_id) {
                return Err(DomainError::ItemNotFound(target_id.clone()));
            }
        }

        let source_list = self.list_mut(from);
        let source_before = order_map(source_list);
        let row = remove(source_list, source_id)?;
        let source_updates = changed_orders(&source_before, source_list);

        let target_list = self.list_mut(to);
        let target_before = order_map(target_list);
        insert(target_list, row, placement)?;
        let target_updates = changed_orders(&target_before, target_list);
        let added = target_list
            .iter()
            .find(|row| row.id == source_id)
            .map(ParamRow::to_add_payload)
            .ok_or_else(|| DomainError::ItemNotFound(source_id.to_string()))?;

        let mut patch = ParamsPatch::default();
        let source_patch = patch.shape_mut(from);
        source_patch.to_update = source_updates;
        source_patch.to_remove.push(source_id.to_string());

        let target_patch = patch.shape_mut(to);
        target_patch.to_update = target_updates;
        target_patch.to_add.push(added);
        Ok(patch)
    }
}
