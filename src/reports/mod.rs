use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use keytrace::api::SessionStats;
use keytrace::coverage::{CoverageReport, CoverageStatus, GapPriority, TargetedTrigraph};
use keytrace::deviation::{DeviationPatternReport, DeviationReport};
use keytrace::features::FeatureOutcome;
use keytrace::patterns::histogram::HistogramBin;
use keytrace::patterns::{DetailedPattern, PatternDetails, PatternReport, PatternStats};
use keytrace::types::TRACKED_FINGERS;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn align_right(table: &mut Table, cols: std::ops::RangeInclusive<usize>) {
    for i in cols {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
}

fn fmt_ms(v: f64) -> String {
    if v.is_finite() {
        format!("{:.1}", v)
    } else {
        "-".to_string()
    }
}

fn short_finger(name: &str) -> String {
    // left_index -> L.ind
    let mut parts = name.splitn(2, '_');
    let side = parts.next().unwrap_or("");
    let finger = parts.next().unwrap_or("");
    format!(
        "{}.{}",
        side.chars().next().unwrap_or('?').to_ascii_uppercase(),
        &finger[..finger.len().min(3)]
    )
}

pub fn print_pattern_table(title: &str, rows: &[PatternStats]) {
    println!("\n{}", title);
    if rows.is_empty() {
        println!("  (no samples)");
        return;
    }

    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Pattern").add_attribute(Attribute::Bold),
        Cell::new("N"),
        Cell::new("Avg").fg(Color::Cyan),
        Cell::new("Raw"),
        Cell::new("Median"),
        Cell::new("MAD"),
        Cell::new("Min"),
        Cell::new("Max"),
        Cell::new("Excl").fg(Color::Red),
    ]);
    align_right(&mut table, 1..=8);

    for p in rows {
        table.add_row(vec![
            Cell::new(format!("{:?}", p.pattern)).add_attribute(Attribute::Bold),
            Cell::new(p.count),
            Cell::new(fmt_ms(p.avg)).fg(Color::Cyan),
            Cell::new(fmt_ms(p.raw_avg)),
            Cell::new(fmt_ms(p.median)),
            Cell::new(fmt_ms(p.mad)),
            Cell::new(fmt_ms(p.min)),
            Cell::new(fmt_ms(p.max)),
            Cell::new(p.excluded_count).fg(if p.excluded_count > 0 {
                Color::Red
            } else {
                Color::Reset
            }),
        ]);
    }
    println!("{}", table);
}

pub fn print_pattern_report(report: &PatternReport) {
    print_pattern_table("⌨️  Digraphs (fastest first)", &report.digraphs);
    print_pattern_table("⌨️  Trigraphs (fastest first)", &report.trigraphs);
    print_pattern_table("🏎️  Fastest transitions", &report.fastest_transitions);
    print_pattern_table("🐢 Slowest transitions", &report.slowest_transitions);
}

fn print_histogram(bins: &[HistogramBin]) {
    let peak = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    for b in bins {
        let bar = "#".repeat((b.count * 30).div_ceil(peak));
        let marker = if b.in_range { ' ' } else { '!' };
        println!("  {:>16} {} {:<30} {}", b.label, marker, bar, b.count);
    }
}

pub fn print_detailed_patterns(title: &str, rows: &[DetailedPattern]) {
    println!("\n{} ({} patterns)", title, rows.len());
    for p in rows {
        println!(
            "\n  {:?}  n={}  avg={}ms  band=[{}, {}]",
            p.stats.pattern,
            p.stats.count,
            fmt_ms(p.stats.avg),
            fmt_ms(p.stats.lower_threshold),
            fmt_ms(p.stats.upper_threshold)
        );
        print_histogram(&p.distribution);
    }
}

pub fn print_pattern_details(d: &PatternDetails) {
    println!("\n🔍 Pattern {:?}", d.pattern);
    println!("   Occurrences: {}", d.occurrences);
    println!("   Accepted samples: {}", d.raw_times.len());
    println!("   Average: {}ms", fmt_ms(d.avg_time));
    if let (Some(lo), Some(hi)) = (d.threshold_low, d.threshold_high) {
        println!("   MAD band: {}..{}ms", fmt_ms(lo), fmt_ms(hi));
    }
    if !d.words.is_empty() {
        println!("   Words: {}", d.words.join(", "));
    }
    print_histogram(&d.distribution);
}

fn status_color(status: CoverageStatus) -> Color {
    match status {
        CoverageStatus::Missing => Color::Red,
        CoverageStatus::Low => Color::Yellow,
        CoverageStatus::Adequate => Color::Cyan,
        CoverageStatus::Good => Color::Green,
    }
}

pub fn print_coverage_report(report: &CoverageReport) {
    let mut table = new_table();
    let mut header = vec![Cell::new("from \\ to").add_attribute(Attribute::Bold)];
    header.extend(
        TRACKED_FINGERS
            .iter()
            .map(|f| Cell::new(short_finger(&f.to_string())).add_attribute(Attribute::Bold)),
    );
    table.add_row(header);
    align_right(&mut table, 1..=TRACKED_FINGERS.len());

    for (row, from) in report.matrix.rows().zip(TRACKED_FINGERS) {
        let mut cells = vec![Cell::new(short_finger(&from.to_string())).add_attribute(Attribute::Bold)];
        cells.extend(
            row.iter()
                .map(|c| Cell::new(c.count).fg(status_color(c.status))),
        );
        table.add_row(cells);
    }
    println!("\n🧭 Finger-pair coverage");
    println!("{}", table);

    let s = &report.summary;
    println!(
        "   Trigraph sessions: {}/{} (min {}) {:.1}%",
        s.total_trigraphs, s.target_trigraphs, s.min_trigraphs, s.trigraph_progress
    );
    println!(
        "   Pairs covered: {}/{} ({:.1}%), well covered: {}",
        s.covered_pairs, s.total_pairs, s.pair_coverage_percent, s.well_covered_pairs
    );
    println!("   Gaps: {}", report.gaps.len());

    let mut gaps = new_table();
    gaps.add_row(vec![
        Cell::new("From").add_attribute(Attribute::Bold),
        Cell::new("To").add_attribute(Attribute::Bold),
        Cell::new("Have"),
        Cell::new("Need"),
        Cell::new("Priority"),
    ]);
    align_right(&mut gaps, 2..=3);
    for g in report.gaps.iter().take(10) {
        let color = match g.priority {
            GapPriority::High => Color::Red,
            GapPriority::Medium => Color::Yellow,
        };
        gaps.add_row(vec![
            Cell::new(g.from),
            Cell::new(g.to),
            Cell::new(g.current),
            Cell::new(g.needed),
            Cell::new(g.priority).fg(color),
        ]);
    }
    if !report.gaps.is_empty() {
        println!("{}", gaps);
    }
}

pub fn print_suggestions(batch: &[TargetedTrigraph]) {
    if batch.is_empty() {
        println!("\n✅ No gaps to target.");
        return;
    }
    println!("\n🎯 Suggested trigraphs");
    for t in batch {
        println!("   {:?}  ({} -> {})", t.trigraph, t.from, t.to);
    }
}

pub fn print_deviation_report(report: &DeviationReport) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Letter").add_attribute(Attribute::Bold),
        Cell::new("Expected"),
        Cell::new("Total"),
        Cell::new("Deviated").fg(Color::Red),
        Cell::new("Rate %"),
    ]);
    align_right(&mut table, 2..=4);
    for l in &report.summary {
        table.add_row(vec![
            Cell::new(l.letter).add_attribute(Attribute::Bold),
            Cell::new(l.expected_finger),
            Cell::new(l.total),
            Cell::new(l.deviated).fg(Color::Red),
            Cell::new(format!("{:.1}", l.deviation_rate)),
        ]);
    }
    println!("\n🖐️  Finger deviations ({} total)", report.total_deviations);
    println!("{}", table);

    if report.words_with_deviations.is_empty() {
        return;
    }
    println!("\n   Words:");
    for w in &report.words_with_deviations {
        let marked: String = w
            .highlighted
            .iter()
            .map(|h| {
                if h.deviated {
                    h.char.to_uppercase().to_string()
                } else {
                    h.char.to_string()
                }
            })
            .collect();
        let swaps: Vec<String> = w
            .deviation_details
            .iter()
            .map(|(c, s)| format!("{}: {} -> {}", c, s.expected, s.actual))
            .collect();
        println!("   {:<16} x{:<4} {}", marked, w.count, swaps.join("; "));
    }
}

pub fn print_deviation_patterns(report: &DeviationPatternReport) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Letter").add_attribute(Attribute::Bold),
        Cell::new("After"),
        Cell::new("Expected"),
        Cell::new("Dominant").fg(Color::Yellow),
        Cell::new("Count"),
        Cell::new("Total"),
    ]);
    align_right(&mut table, 4..=5);
    for p in &report.patterns {
        table.add_row(vec![
            Cell::new(p.letter).add_attribute(Attribute::Bold),
            Cell::new(format!("{:?}", p.prev_key)),
            Cell::new(p.expected_finger),
            Cell::new(p.dominant_finger).fg(Color::Yellow),
            Cell::new(p.dominant_count),
            Cell::new(p.total),
        ]);
    }
    println!(
        "\n🔁 Deviation triggers ({} of {})",
        report.patterns.len(),
        report.total_patterns
    );
    println!("{}", table);
}

pub fn print_feature_outcome(session_id: i64, outcome: &FeatureOutcome) {
    match outcome {
        FeatureOutcome::Computed(batch) => {
            println!("\n🧮 Session {}: {} transition features", session_id, batch.len());
            let mut table = new_table();
            table.add_row(vec![
                Cell::new("Keystroke").add_attribute(Attribute::Bold),
                Cell::new("From"),
                Cell::new("To"),
                Cell::new("Hand"),
                Cell::new("Finger"),
                Cell::new("Dist cm"),
                Cell::new("Rows"),
                Cell::new("Inward"),
                Cell::new("Fitts"),
            ]);
            align_right(&mut table, 5..=8);
            for f in batch {
                let x = &f.feature;
                table.add_row(vec![
                    Cell::new(f.keystroke_id),
                    Cell::new(x.finger_from),
                    Cell::new(x.finger_to),
                    Cell::new(if x.same_hand { "same" } else { "alt" }),
                    Cell::new(if x.same_finger { "same" } else { "-" }),
                    Cell::new(format!("{:.2}", x.euclidean_distance)),
                    Cell::new(x.row_difference),
                    Cell::new(if x.is_inward { "yes" } else { "-" }),
                    Cell::new(format!("{:.3}", x.fitts_law_cost)),
                ]);
            }
            println!("{}", table);
        }
        FeatureOutcome::IncompleteAnnotations { indices } => {
            println!(
                "\n⚠️  Session {} is missing annotations at positions {:?}",
                session_id, indices
            );
        }
    }
}

pub fn print_stats(s: &SessionStats) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);
    align_right(&mut table, 1..=1);
    let rows: Vec<(String, String)> = vec![
        ("Sessions".into(), s.total_sessions.to_string()),
        ("Keystrokes".into(), s.total_keystrokes.to_string()),
        ("Prompt characters".into(), s.total_characters.to_string()),
        (
            "Keystrokes / session".into(),
            format!("{:.1}", s.avg_keystrokes_per_session),
        ),
        (
            "Characters / session".into(),
            format!("{:.1}", s.avg_characters_per_session),
        ),
        ("Unique digraphs".into(), s.unique_digraphs.to_string()),
        (
            "Sessions with features".into(),
            s.sessions_with_features.to_string(),
        ),
        ("Features".into(), s.total_features.to_string()),
    ];
    for (k, v) in rows {
        table.add_row(vec![Cell::new(k), Cell::new(v)]);
    }
    for (mode, n) in &s.sessions_by_mode {
        table.add_row(vec![Cell::new(format!("  mode {}", mode)), Cell::new(n)]);
    }
    println!("\n📊 Collection stats");
    println!("{}", table);
}
