pub mod formatter;

pub use formatter::{
    format_history_table, format_report, format_rules, format_score, format_tier, format_tsv,
    should_use_colors,
};
