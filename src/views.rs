use tracing::{info, warn};

use crate::warehouse::{Warehouse, quote_ident};

pub const DATASET_PLACEHOLDER: &str = "{dataset_id}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewDefinition {
    pub name: &'static str,
    pub body: &'static str,
}

macro_rules! view {
    ($name:literal) => {
        ViewDefinition {
            name: $name,
            body: include_str!(concat!("../sql/views/", $name, ".sql")),
        }
    };
}

/// Creation order; later views read from `v_pick_points`.
pub const VIEW_DEFINITIONS: &[ViewDefinition] = &[
    view!("v_pick_points"),
    view!("agg_league_standings"),
    view!("agg_manager_momentum"),
    view!("agg_bench_points"),
    view!("agg_player_contribution"),
    view!("agg_manager_consistency"),
    view!("agg_draft_picks_analysis"),
    view!("agg_top_transfers"),
];

pub fn render_template(template: &str, dataset_id: &str) -> String {
    template.replace(DATASET_PLACEHOLDER, dataset_id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFailure {
    pub label: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<StatementFailure>,
}

impl MaterializeReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct ViewMaterializer<'a, W: ?Sized> {
    warehouse: &'a mut W,
}

impl<'a, W> ViewMaterializer<'a, W>
where
    W: Warehouse + ?Sized,
{
    pub fn new(warehouse: &'a mut W) -> Self {
        Self { warehouse }
    }

    pub fn materialize_default_views(&mut self) -> MaterializeReport {
        self.materialize_views(VIEW_DEFINITIONS)
    }

    pub fn materialize_views(&mut self, views: &[ViewDefinition]) -> MaterializeReport {
        let dataset = self.warehouse.dataset_id().to_string();
        info!(dataset = %dataset, views = views.len(), "creating views");

        let mut report = MaterializeReport::default();
        for view in views {
            let qualified = format!("{}.{}", quote_ident(&dataset), quote_ident(view.name));
            let body = render_template(view.body, &dataset);
            let statements = [
                format!("DROP VIEW IF EXISTS {qualified}"),
                format!("CREATE VIEW {qualified} AS\n{}", body.trim().trim_end_matches(';')),
            ];
            let mut failed = false;
            for sql in &statements {
                if let Err(err) = self.warehouse.execute(sql) {
                    warn!(view = view.name, error = %err, "view statement failed");
                    report.failed.push(StatementFailure {
                        label: view.name.to_string(),
                        error: err.to_string(),
                    });
                    failed = true;
                    break;
                }
            }
            if !failed {
                info!(view = view.name, "view created");
                report.succeeded.push(view.name.to_string());
            }
        }
        report
    }

    pub fn materialize_script(&mut self, template: &str) -> MaterializeReport {
        let dataset = self.warehouse.dataset_id().to_string();
        let statements = split_sql_statements(&render_template(template, &dataset));
        info!(dataset = %dataset, statements = statements.len(), "executing script");

        let mut report = MaterializeReport::default();
        for (idx, sql) in statements.iter().enumerate() {
            let label = format!("statement {}: {}", idx + 1, preview(sql));
            match self.warehouse.execute(sql) {
                Ok(()) => report.succeeded.push(label),
                Err(err) => {
                    warn!(statement = idx + 1, error = %err, "statement failed: {}", preview(sql));
                    report.failed.push(StatementFailure {
                        label,
                        error: err.to_string(),
                    });
                }
            }
        }
        report
    }
}

/// Splits on `;` outside quoted strings, quoted identifiers and comments.
/// Pieces holding only whitespace or comments are dropped.
pub fn split_sql_statements(script: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut has_code = false;
    let mut chars = script.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' | '`' | '[' => {
                let close = if ch == '[' { ']' } else { ch };
                current.push(ch);
                has_code = true;
                while let Some(c) = chars.next() {
                    current.push(c);
                    if c != close {
                        continue;
                    }
                    // Doubled quote is an escaped quote, not the end.
                    if close != ']'
                        && let Some(escaped) = chars.next_if_eq(&close)
                    {
                        current.push(escaped);
                        continue;
                    }
                    break;
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                current.push(ch);
                for c in chars.by_ref() {
                    current.push(c);
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                current.push(ch);
                if let Some(star) = chars.next() {
                    current.push(star);
                }
                let mut prev = '\0';
                for c in chars.by_ref() {
                    current.push(c);
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            ';' => flush_statement(&mut out, &mut current, &mut has_code),
            _ => {
                if !ch.is_whitespace() {
                    has_code = true;
                }
                current.push(ch);
            }
        }
    }
    flush_statement(&mut out, &mut current, &mut has_code);
    out
}

fn flush_statement(out: &mut Vec<String>, current: &mut String, has_code: &mut bool) {
    if *has_code {
        out.push(current.trim().to_string());
    }
    current.clear();
    *has_code = false;
}

fn preview(sql: &str) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > 80 {
        format!("{}...", flat.chars().take(80).collect::<String>())
    } else {
        flat
    }
}
