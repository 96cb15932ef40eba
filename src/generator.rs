//! Generation pipeline: read sources, build the model, render one target, write atomically.

use crate::config::{GeneratorConfig, RenderContext};
use crate::emit::{emitter_for, write_artifacts, Artifact};
use crate::error::{GenError, SchemaError};
use crate::model::{ModelBuilder, ProtocolModel};
use crate::parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// One schema source: identifier (usually the path it was read from) and its text.
#[derive(Debug, Clone)]
pub struct Source {
    pub id: String,
    pub text: String,
}

impl Source {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Source { id: id.into(), text: text.into() }
    }
}

/// Parse every source in order and build the finished model.
pub fn load_model(sources: &[Source], context: RenderContext) -> Result<ProtocolModel, SchemaError> {
    let mut builder = ModelBuilder::new(context);
    for source in sources {
        let doc = parser::parse(&source.id, &source.text)?;
        info!(
            source = %source.id,
            enums = doc.enums.len(),
            messages = doc.messages.len(),
            "parsed definitions"
        );
        builder.add_source(&source.id, &doc)?;
    }
    let model = builder.finish();
    info!(
        groups = model.groups.len(),
        enums = model.enums.len(),
        messages = model.messages.len(),
        "protocol model built"
    );
    Ok(model)
}

/// Render the configured target without writing anything.
pub fn render(config: &GeneratorConfig, model: &ProtocolModel) -> Result<Vec<Artifact>, GenError> {
    let emitter = emitter_for(config.target);
    info!(target = %emitter.target(), "generating sources");
    emitter.emit(model)
}

/// Run a whole generation; returns the paths written. Nothing is written unless every step succeeds.
pub fn generate(config: &GeneratorConfig) -> Result<Vec<PathBuf>, GenError> {
    let output_dir = config.validate()?;
    let mut sources = Vec::with_capacity(config.sources.len());
    for path in &config.sources {
        let text = fs::read_to_string(path).map_err(|source| GenError::Read {
            path: path.display().to_string(),
            source,
        })?;
        sources.push(Source::new(path.display().to_string(), text));
    }
    let model = load_model(&sources, config.context)?;
    let artifacts = render(config, &model)?;
    let written = write_artifacts(output_dir, &artifacts)?;
    info!(files = written.len(), dir = %output_dir.display(), "artifacts written");
    Ok(written)
}
