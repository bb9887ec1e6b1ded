//! Ad-hoc table layout from command-line flags.

use clap::Args;

use panache_core::metadata::EntityMetadata;

use crate::error::{CliError, Result};
use crate::params::parse_field;

/// Describes the table a command works on.
#[derive(Debug, Clone, Args)]
pub struct TableArgs {
    /// Table name.
    #[arg(long, global = true, env = "PANACHE_TABLE", default_value = "")]
    pub table: String,

    /// Partition key as name[:type]. The type defaults to string.
    #[arg(long, global = true, default_value = "id")]
    pub partition_key: String,

    /// Sort key as name[:type].
    #[arg(long, global = true)]
    pub sort_key: Option<String>,

    /// Queryable field as name:type, with type one of s, n, b, bool, l, m (repeatable).
    #[arg(long = "field", short = 'f', global = true)]
    pub fields: Vec<String>,
}

impl TableArgs {
    /// Builds the entity metadata the flags describe.
    ///
    /// Key fields not repeated with `--field` are declared from their
    /// `--partition-key` / `--sort-key` spelling.
    pub fn metadata(&self) -> Result<EntityMetadata> {
        if self.table.is_empty() {
            return Err(CliError::MissingTable);
        }
        let (partition_key, partition_type) = parse_field(&self.partition_key)?;
        let sort = self.sort_key.as_deref().map(parse_field).transpose()?;
        let fields = self
            .fields
            .iter()
            .map(|raw| parse_field(raw))
            .collect::<Result<Vec<_>>>()?;

        let mut builder = EntityMetadata::builder(self.table.clone()).table(self.table.clone());
        if !fields.iter().any(|(name, _)| *name == partition_key) {
            builder = builder.field(partition_key.clone(), partition_type);
        }
        if let Some((sort_key, sort_type)) = &sort {
            if !fields.iter().any(|(name, _)| name == sort_key) {
                builder = builder.field(sort_key.clone(), *sort_type);
            }
        }
        for (name, field_type) in fields {
            builder = builder.field(name, field_type);
        }

        builder = builder.partition_key(partition_key);
        if let Some((sort_key, _)) = sort {
            builder = builder.sort_key(sort_key);
        }
        Ok(builder.build()?)
    }
}
