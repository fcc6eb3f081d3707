use assetstack::{RunDetails, Stack, StackRun};
use std::time::Duration;

/// Roles a report fragment can take; each maps to one SGR sequence.
#[derive(Debug, Clone, Copy)]
enum Tone {
    Title,
    Rule,
    Label,
    Count,
    Primary,
    Child,
    Muted,
}

impl Tone {
    fn sgr(self) -> &'static str {
        match self {
            Tone::Title => "1;36",
            Tone::Rule => "90",
            Tone::Label => "34",
            Tone::Count => "32",
            Tone::Primary => "1;32",
            Tone::Child => "34",
            Tone::Muted => "2",
        }
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn paint(&self, tone: Tone, s: impl AsRef<str>) -> String {
        if self.enabled { format!("\x1b[{}m{}\x1b[0m", tone.sgr(), s.as_ref()) } else { s.as_ref().to_string() }
    }

    fn rule(&self, title: &str) {
        println!("\n{}", self.paint(Tone::Rule, format!("── {title} ")));
    }
}

/// Stacks listed before the rest is summarized.
const MAX_LISTED: usize = 50;

pub fn print_run(source: &str, run: &StackRun, color: bool) {
    let palette = Palette { enabled: color };
    let details = &run.details;

    println!("{}", palette.paint(Tone::Title, format!("assetstack: {source} ({} mode)", details.mode)));
    println!(
        "{}",
        palette.paint(
            Tone::Muted,
            format!("{} of {} assets considered, features {:?}", details.assets_considered, details.assets_total, details.features)
        )
    );

    palette.rule("stages");
    print_stages(details, &palette);

    palette.rule(&format!("stacks ({})", run.stacks.len()));
    if run.stacks.is_empty() {
        println!("  {}", palette.paint(Tone::Muted, "none; RUST_LOG=assetstack=trace lists extraction misses"));
    } else {
        print_stacks(&run.stacks, &palette);
    }
    println!();
}

fn print_stages(details: &RunDetails, palette: &Palette) {
    // Array of (stage, output count, elapsed)
    let rows: [(&str, Option<usize>, Duration); 5] = [
        ("group", Some(details.buckets), details.grouping),
        ("merge", Some(details.merged_buckets), details.merge),
        ("cluster", None, details.clustering),
        ("sort", Some(details.stacked_assets), details.sort),
        ("total", None, details.total),
    ];
    for (stage, count, elapsed) in rows {
        let count = count.map(|c| c.to_string()).unwrap_or_default();
        println!(
            "  {} {} {}",
            palette.paint(Tone::Label, format!("{stage:<8}")),
            palette.paint(Tone::Count, format!("{count:>7}")),
            palette.paint(Tone::Muted, format!("{elapsed:>12.2?}")),
        );
    }
}

fn print_stacks(stacks: &[Stack], palette: &Palette) {
    for (idx, stack) in stacks.iter().take(MAX_LISTED).enumerate() {
        println!(
            "  {} {} {}",
            palette.paint(Tone::Muted, format!("#{idx:<3}")),
            palette.paint(Tone::Primary, &stack.primary().original_file_name),
            palette.paint(Tone::Muted, format!("(+{})", stack.children().len())),
        );
        for child in stack.children() {
            println!("       {}", palette.paint(Tone::Child, &child.original_file_name));
        }
    }
    if stacks.len() > MAX_LISTED {
        println!("  {}", palette.paint(Tone::Muted, format!("... {} more", stacks.len() - MAX_LISTED)));
    }
}
