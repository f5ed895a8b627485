use serde::{Deserialize, Serialize};

/// Why a reference failed to resolve to a physical column or constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnresolvedReason {
    CycleDetected,
    DepthGuard,
    AliasNotFound,
    MissingProjection,
    ColumnNotFound,
    Ambiguous,
    PartialFailure,
    CompleteFailure,
    StarExpansionFailed,
    ParserLimitation,
    DynamicSql,
    RemoteDbLink,
}

/// The outcome of resolving a single leaf reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolvedColumn {
    Physical {
        table: String,
        column: String,
        dm_match: bool,
        trace_path: String,
        source_alias: Option<String>,
        original_ref: String,
    },
    Constant {
        literal_text: String,
        trace_path: String,
    },
    Unresolved {
        reason: UnresolvedReason,
        trace_path: String,
        failing_ref: String,
        debug_context: String,
    },
}

impl ResolvedColumn {
    pub fn is_physical(&self) -> bool {
        matches!(self, ResolvedColumn::Physical { .. })
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, ResolvedColumn::Unresolved { .. })
    }

    pub fn trace_path(&self) -> &str {
        match self {
            ResolvedColumn::Physical { trace_path, .. }
            | ResolvedColumn::Constant { trace_path, .. }
            | ResolvedColumn::Unresolved { trace_path, .. } => trace_path,
        }
    }

    pub fn with_trace_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        match &mut self {
            ResolvedColumn::Physical { trace_path, .. }
            | ResolvedColumn::Constant { trace_path, .. }
            | ResolvedColumn::Unresolved { trace_path, .. } => *trace_path = path,
        }
        self
    }

    pub fn unresolved(
        reason: UnresolvedReason,
        trace_path: impl Into<String>,
        failing_ref: impl Into<String>,
        debug_context: impl Into<String>,
    ) -> Self {
        ResolvedColumn::Unresolved {
            reason,
            trace_path: trace_path.into(),
            failing_ref: failing_ref.into(),
            debug_context: debug_context.into(),
        }
    }
}
