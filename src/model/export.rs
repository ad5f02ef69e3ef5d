//! Writing objects out as JSON-LD files

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{Value as JsonValue, json};
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::json_ld::Document;
use crate::session::Session;
use crate::transport::Transport;

use super::{KgObject, NodeRef, Value};

const EXTENSION: &str = "jsonld";

impl KgObject {
    /// Write this object and the linked objects it holds in memory as
    /// JSON-LD. Objects without an id are given one under the store's
    /// instance prefix, so links between the files resolve.
    ///
    /// With `single_file`, `path` is a `.jsonld` file holding one `@graph`
    /// of every object. Otherwise `path` is a directory and each object goes
    /// to `<uuid>.jsonld` in it. Returns the files written.
    pub fn export<T: Transport>(
        &mut self,
        session: &Session<T>,
        path: impl AsRef<Path>,
        single_file: bool,
    ) -> Result<Vec<PathBuf>> {
        let path = path.as_ref();
        if single_file && path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
            return Err(Error::value(format!(
                "cannot export to {}, expected a .{EXTENSION} file",
                path.display()
            )));
        }
        let mut documents = Vec::new();
        self.collect_for_export(session.instance_prefix(), &mut documents);
        info!(target: "kg", objects = documents.len(), path = %path.display(), "exporting");

        if single_file {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let graph: Vec<JsonValue> = documents
                .into_iter()
                .map(|(_, document)| JsonValue::Object(document))
                .collect();
            write_json(path, &json!({ "@graph": graph }))?;
            return Ok(vec![path.to_path_buf()]);
        }

        fs::create_dir_all(path)?;
        documents
            .into_iter()
            .map(|(uuid, document)| {
                let file = path.join(format!("{uuid}.{EXTENSION}"));
                write_json(&file, &JsonValue::Object(document))?;
                Ok(file)
            })
            .collect()
    }

    /// Children come before the objects linking to them, each listed once.
    fn collect_for_export(&mut self, instance_prefix: &str, documents: &mut Vec<(String, Document)>) {
        if self.id.is_none() {
            self.id = Some(format!("{instance_prefix}{}", Uuid::new_v4()));
        }
        for value in self.values.values_mut() {
            for item in value.items_mut() {
                if let Value::Node(NodeRef::Resolved(child)) = item {
                    child.collect_for_export(instance_prefix, documents);
                }
            }
        }
        let uuid = self.uuid().unwrap_or_default().to_string();
        if documents.iter().all(|(seen, _)| *seen != uuid) {
            documents.push((uuid, self.to_jsonld(false, false)));
        }
    }
}

fn write_json(path: &Path, value: &JsonValue) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
