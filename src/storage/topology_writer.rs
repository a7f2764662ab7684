//! Serialization of the relation set.
//!
//! The file is written once, after the join has finished: the serializer
//! writes to a hidden sibling file which is renamed over the destination only
//! when everything has been flushed, so an aborted run never leaves a partial
//! topology behind.

use crate::core::{EntityId, Relation, RelationSet};
use crate::error::{Result, TopologyError};
use crate::vocab::Namespace;
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{NamedNode, Term, Triple};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Output format picked from the file extension; Turtle when unknown.
pub fn format_for_path(path: &Path) -> RdfFormat {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(RdfFormat::from_extension)
        .unwrap_or(RdfFormat::Turtle)
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

fn to_triple(relation: &Relation) -> Result<Triple> {
    Ok(Triple::new(
        NamedNode::new(relation.source.as_str())?,
        NamedNode::new(relation.predicate.as_str())?,
        NamedNode::new(relation.target.as_str())?,
    ))
}

/// Write `relations` to `path`. Returns the number of triples written.
pub fn write_topology(path: &Path, relations: &RelationSet) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| TopologyError::io(parent, e))?;
    }

    let staging = staging_path(path);
    let file = File::create(&staging).map_err(|e| TopologyError::io(&staging, e))?;

    let mut serializer = RdfSerializer::from_format(format_for_path(path));
    for ns in Namespace::ALL {
        serializer = serializer.with_prefix(ns.prefix(), ns.base_iri())?;
    }
    let mut writer = serializer.for_writer(BufWriter::new(file));

    let outcome = (|| -> Result<()> {
        for relation in relations {
            writer
                .serialize_triple(&to_triple(relation)?)
                .map_err(|e| TopologyError::Serialization(e.to_string()))?;
        }
        let mut buffered =
            writer.finish().map_err(|e| TopologyError::Serialization(e.to_string()))?;
        buffered.flush().map_err(|e| TopologyError::io(&staging, e))?;
        Ok(())
    })();

    if let Err(err) = outcome {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }

    fs::rename(&staging, path).map_err(|e| TopologyError::io(path, e))?;
    info!(path = %path.display(), triples = relations.len(), "topology written");
    Ok(relations.len())
}

/// Read a topology file back into a relation set. Statements whose subject or
/// object is not an IRI are ignored.
pub fn read_topology(path: &Path) -> Result<RelationSet> {
    let file = File::open(path).map_err(|e| TopologyError::io(path, e))?;
    let mut relations = RelationSet::new();

    for quad in RdfParser::from_format(format_for_path(path)).for_reader(BufReader::new(file)) {
        let quad = quad?;
        let (Term::NamedNode(source), Term::NamedNode(target)) =
            (Term::from(quad.subject), quad.object)
        else {
            continue;
        };
        relations.insert(Relation::new(
            EntityId::new(source.into_string()),
            quad.predicate.into_string(),
            EntityId::new(target.into_string()),
        ));
    }

    Ok(relations)
}
