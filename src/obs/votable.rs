//! The VOTable XML returned by ASVO observation searches.

use std::path::Path;

use indexmap::IndexMap;
use log::{debug, trace};
use roxmltree::{Document, Node};

use super::{MetaValue, ObsMetadataError, Observation};

fn is_tag(node: Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(tag)
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| is_tag(*n, tag))
}

/// Parse the first table of a VOTable. The `FIELD` names of the table are the
/// columns; every `TR` becomes an [`Observation`]. Cells beyond the declared
/// fields are ignored, and rows with fewer cells only get the leading columns.
pub fn parse_asvo_xml(xml: &str) -> Result<Vec<Observation>, ObsMetadataError> {
    let doc = Document::parse(xml)?;
    let table = doc
        .descendants()
        .find(|n| is_tag(*n, "table"))
        .ok_or(ObsMetadataError::NoTable)?;

    let columns: Vec<&str> = children(table, "field")
        .map(|n| n.attribute("name").unwrap_or_default())
        .collect();
    trace!("Observation table columns: {columns:?}");

    let rows = children(table, "data")
        .flat_map(|data| children(data, "tabledata"))
        .flat_map(|tabledata| children(tabledata, "tr"));
    let observations: Vec<Observation> = rows
        .map(|tr| {
            let fields: IndexMap<String, MetaValue> = columns
                .iter()
                .zip(children(tr, "td"))
                .map(|(&name, td)| (name.to_string(), MetaValue::parse(td.text())))
                .collect();
            Observation { fields }
        })
        .collect();
    debug!("Parsed {} observations", observations.len());
    Ok(observations)
}

pub fn read_asvo_xml<P: AsRef<Path>>(file: P) -> Result<Vec<Observation>, ObsMetadataError> {
    let file = file.as_ref();
    debug!("Reading observations from {}", file.display());
    let xml = std::fs::read_to_string(file).map_err(|err| ObsMetadataError::Read {
        file: file.to_path_buf(),
        err,
    })?;
    parse_asvo_xml(&xml)
}
