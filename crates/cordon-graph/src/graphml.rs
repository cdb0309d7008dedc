//! GraphML network loader.
//!
//! # Usage
//!
//! ```ignore
//! use std::path::Path;
//! use cordon_graph::graphml::load_graphml_file;
//!
//! let graph = load_graphml_file(Path::new("networks/noailles.graphml"))?;
//! ```
//!
//! # What is loaded
//!
//! Simplified OSM road networks as written by the extraction pipeline:
//!
//! - node data keys `x`, `y` (lon/lat) and `inner` (`"True"`/`"False"`);
//! - edge data keys `travel_time` (seconds), `highway` (class or
//!   stringified list), `oneway` (`"True"`/`"False"`), optional `geometry`
//!   (WKT LineString);
//! - graph data keys `escape_nodes` (comma-separated node IDs), `boundary`
//!   and `boundary_buff` (WKT polygons).
//!
//! Unknown keys are ignored, so files carrying extra attributes (bearings,
//! speeds, names) load unchanged.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use geo::{LineString, Polygon};
use log::info;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rustc_hash::FxHashMap;
use wkt::TryFromWkt;

use cordon_core::NodeId;

use crate::error::{GraphError, GraphResult};
use crate::graph::{EdgeAttrs, RoadGraph, RoadGraphBuilder};
use crate::highway::parse_highway_attr;

// ── Public entry points ───────────────────────────────────────────────────────

/// Load a road network from a GraphML file on disk.
pub fn load_graphml_file(path: &Path) -> GraphResult<RoadGraph> {
    info!("loading road network from {}", path.display());
    load_graphml(BufReader::new(File::open(path)?))
}

/// Load the named network from a directory of `<name>.graphml` files.
///
/// Acquisition of the files themselves (downloads, OSM extraction) is the
/// caller's concern; this only resolves the conventional file name.
pub fn load_graph(dir: &Path, name: &str) -> GraphResult<RoadGraph> {
    load_graphml_file(&dir.join(format!("{name}.graphml")))
}

/// Load a road network from any GraphML byte stream.
pub fn load_graphml<R: BufRead>(reader: R) -> GraphResult<RoadGraph> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    // GraphML indirects attribute names through <key> declarations; resolve
    // "d7" → "travel_time" etc. as the keys stream past.
    let mut key_names: FxHashMap<String, String> = FxHashMap::default();

    let mut builder = RoadGraphBuilder::new();
    let mut graph_attrs: FxHashMap<String, String> = FxHashMap::default();
    let mut element: Option<PendingElement> = None;
    let mut data_key: Option<String> = None;

    let mut buf = Vec::new();
    loop {
        let event = xml
            .read_event_into(&mut buf)
            .map_err(|e| GraphError::Parse(e.to_string()))?;
        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"node" => {
                    let id = parse_node_id(&required_attr(&e, b"id")?)?;
                    element = Some(PendingElement::node(id));
                }
                b"edge" => {
                    let source = parse_node_id(&required_attr(&e, b"source")?)?;
                    let target = parse_node_id(&required_attr(&e, b"target")?)?;
                    element = Some(PendingElement::edge(source, target));
                }
                b"data" => {
                    let key = required_attr(&e, b"key")?;
                    data_key = Some(key_names.get(&key).cloned().unwrap_or(key));
                }
                b"key" => {
                    let id = required_attr(&e, b"id")?;
                    let name = required_attr(&e, b"attr.name")?;
                    key_names.insert(id, name);
                }
                _ => {}
            },
            // <key .../> declarations are usually self-closing; a
            // self-closing <node/> or <edge/> carries no data and flushes
            // right away.
            Event::Empty(e) => match e.local_name().as_ref() {
                b"key" => {
                    let id = required_attr(&e, b"id")?;
                    let name = required_attr(&e, b"attr.name")?;
                    key_names.insert(id, name);
                }
                b"node" => {
                    let id = parse_node_id(&required_attr(&e, b"id")?)?;
                    PendingElement::node(id).flush(&mut builder)?;
                }
                b"edge" => {
                    let source = parse_node_id(&required_attr(&e, b"source")?)?;
                    let target = parse_node_id(&required_attr(&e, b"target")?)?;
                    PendingElement::edge(source, target).flush(&mut builder)?;
                }
                _ => {}
            },
            Event::Text(t) => {
                if let Some(key) = data_key.take() {
                    let value = t
                        .unescape()
                        .map_err(|e| GraphError::Parse(e.to_string()))?
                        .into_owned();
                    match &mut element {
                        Some(pending) => {
                            pending.attrs.insert(key, value);
                        }
                        None => {
                            graph_attrs.insert(key, value);
                        }
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"data" => data_key = None,
                b"node" | b"edge" => {
                    if let Some(pending) = element.take() {
                        pending.flush(&mut builder)?;
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    apply_graph_attrs(&mut builder, &graph_attrs)?;
    let graph = builder.build()?;
    info!(
        "loaded road network: {} nodes, {} edges, {} escape nodes",
        graph.node_count(),
        graph.edge_count(),
        graph.escape_nodes().len()
    );
    Ok(graph)
}

// ── Pending elements ──────────────────────────────────────────────────────────

enum ElementKind {
    Node { id: NodeId },
    Edge { source: NodeId, target: NodeId },
}

struct PendingElement {
    kind: ElementKind,
    attrs: FxHashMap<String, String>,
}

impl PendingElement {
    fn node(id: NodeId) -> Self {
        Self { kind: ElementKind::Node { id }, attrs: FxHashMap::default() }
    }

    fn edge(source: NodeId, target: NodeId) -> Self {
        Self { kind: ElementKind::Edge { source, target }, attrs: FxHashMap::default() }
    }

    fn flush(self, builder: &mut RoadGraphBuilder) -> GraphResult<()> {
        match self.kind {
            ElementKind::Node { id } => {
                let x = parse_float(&self.attrs, "x", id)?;
                let y = parse_float(&self.attrs, "y", id)?;
                let inner = match self.attrs.get("inner") {
                    Some(raw) => parse_bool(raw)?,
                    None => false,
                };
                builder.add_node(id, x, y, inner);
            }
            ElementKind::Edge { source, target } => {
                let travel_time = self
                    .attrs
                    .get("travel_time")
                    .ok_or_else(|| {
                        GraphError::Parse(format!("edge {source}->{target} has no travel_time"))
                    })?
                    .parse::<f64>()
                    .map_err(|e| {
                        GraphError::Parse(format!("edge {source}->{target} travel_time: {e}"))
                    })?;
                if travel_time <= 0.0 {
                    return Err(GraphError::Parse(format!(
                        "edge {source}->{target} has non-positive travel_time {travel_time}"
                    )));
                }
                let highway_rank = self
                    .attrs
                    .get("highway")
                    .map(|raw| parse_highway_attr(raw))
                    .unwrap_or(0);
                let oneway = match self.attrs.get("oneway") {
                    Some(raw) => parse_bool(raw)?,
                    None => false,
                };
                let geometry = match self.attrs.get("geometry") {
                    Some(raw) => Some(LineString::try_from_wkt_str(raw).map_err(|e| {
                        GraphError::Parse(format!("edge {source}->{target} geometry: {e}"))
                    })?),
                    None => None,
                };
                builder.add_edge(
                    source,
                    target,
                    EdgeAttrs { travel_time, highway_rank, oneway, geometry },
                );
            }
        }
        Ok(())
    }
}

// ── Attribute parsing helpers ─────────────────────────────────────────────────

fn apply_graph_attrs(
    builder: &mut RoadGraphBuilder,
    attrs: &FxHashMap<String, String>,
) -> GraphResult<()> {
    if let Some(raw) = attrs.get("escape_nodes") {
        let mut nodes = Vec::new();
        for part in raw.split(',') {
            let part = part.trim();
            if !part.is_empty() {
                nodes.push(parse_node_id(part)?);
            }
        }
        builder.set_escape_nodes(nodes);
    }
    if let (Some(b), Some(bb)) = (attrs.get("boundary"), attrs.get("boundary_buff")) {
        let boundary = Polygon::try_from_wkt_str(b)
            .map_err(|e| GraphError::Parse(format!("boundary polygon: {e}")))?;
        let boundary_buff = Polygon::try_from_wkt_str(bb)
            .map_err(|e| GraphError::Parse(format!("boundary_buff polygon: {e}")))?;
        builder.set_boundaries(boundary, boundary_buff);
    }
    Ok(())
}

fn required_attr(e: &BytesStart<'_>, name: &[u8]) -> GraphResult<String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| GraphError::Parse(e.to_string()))?;
        if attr.key.as_ref() == name {
            return Ok(attr
                .unescape_value()
                .map_err(|e| GraphError::Parse(e.to_string()))?
                .into_owned());
        }
    }
    Err(GraphError::Parse(format!(
        "<{}> element missing {} attribute",
        String::from_utf8_lossy(e.local_name().as_ref()),
        String::from_utf8_lossy(name)
    )))
}

fn parse_node_id(raw: &str) -> GraphResult<NodeId> {
    raw.trim()
        .parse::<i64>()
        .map(NodeId)
        .map_err(|e| GraphError::Parse(format!("node id {raw:?}: {e}")))
}

fn parse_float(attrs: &FxHashMap<String, String>, key: &str, node: NodeId) -> GraphResult<f64> {
    attrs
        .get(key)
        .ok_or_else(|| GraphError::Parse(format!("node {node} has no {key} attribute")))?
        .parse::<f64>()
        .map_err(|e| GraphError::Parse(format!("node {node} {key}: {e}")))
}

/// Strict `"True"`/`"False"` conversion.  The generic string parse would
/// happily read `"False"` as truthy, so only the two literals are accepted.
fn parse_bool(raw: &str) -> GraphResult<bool> {
    match raw {
        "True" => Ok(true),
        "False" => Ok(false),
        other => Err(GraphError::Parse(format!("invalid literal for boolean: {other:?}"))),
    }
}
