//! `users` and `comments` commands: per-entity lookups from a videos CSV

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, info_span, warn, Instrument, Span};

use super::{Cli, CliError};
use crate::fetcher::lookup::{EntityLookup, LookupRun};
use crate::fetcher::retry::{RetryGate, RetryPolicy};
use crate::fetcher::ApiConnector;
use crate::output::{read_column, write_entities, WriteMode};
use crate::shutdown::SharedShutdown;
use crate::EntityKind;

/// Arguments of the lookup commands
#[derive(Parser, Debug)]
pub struct LookupArgs {
    /// Videos CSV produced by the `videos` command
    #[arg(long)]
    pub input: PathBuf,

    /// CSV to write the results to (overwritten)
    #[arg(long)]
    pub output: PathBuf,
}

impl LookupArgs {
    /// Column of the videos CSV holding the lookup keys
    pub fn key_column(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::User => "username",
            EntityKind::Video | EntityKind::Comment => "id",
        }
    }

    /// Look up `kind` for every distinct key in the input
    pub async fn execute(
        &self,
        kind: EntityKind,
        cli: &Cli,
        shutdown: SharedShutdown,
    ) -> Result<LookupRun, CliError> {
        let keys = read_column(&self.input, Self::key_column(kind))?;
        info!("{} {} lookups from {}", keys.len(), kind, self.input.display());

        let api = cli.connector()?.connect().await?;
        let gate = RetryGate::new(RetryPolicy::bounded()).with_shutdown(Some(shutdown));

        let span = info_span!("lookup", kind = %kind, input = %self.input.display());
        let run = async {
            let lookup = EntityLookup::new(api.as_ref(), Span::current()).with_gate(gate);
            match kind {
                EntityKind::User => lookup.user_info(&keys).await,
                EntityKind::Video | EntityKind::Comment => lookup.comments(&keys).await,
            }
        }
        .instrument(span)
        .await;

        if let Some(reason) = &run.stopped {
            warn!("{} lookups stopped early: {}", kind, reason);
        }

        let rows = write_entities(&self.output, &run.entities, WriteMode::Overwrite)?;
        info!(
            "done getting {}: {} rows ({} errors) -> {}",
            kind,
            rows,
            run.errors,
            self.output.display()
        );
        Ok(run)
    }
}
