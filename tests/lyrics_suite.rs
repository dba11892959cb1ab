use pulse_canvas::lyrics::LyricSheet;

const SHEET: &str = "\
First line

Second line
   Third line
Fourth line
";

#[test]
fn parse_keeps_non_empty_trimmed_lines() {
    let sheet = LyricSheet::parse(SHEET).unwrap();
    assert_eq!(sheet.line_count(), 4);
}

#[test]
fn parse_rejects_empty_input() {
    assert!(LyricSheet::parse("").is_err());
    assert!(LyricSheet::parse("\n   \n\n").is_err());
}

#[test]
fn no_line_before_the_start_offset() {
    let sheet = LyricSheet::parse(SHEET).unwrap();
    // The 4-second lead still leaves this before the start offset.
    assert_eq!(sheet.current_index(-3.0, 60.0), None);
    assert_eq!(sheet.current_line(-3.0, 60.0), None);
}

#[test]
fn lead_puts_the_first_line_up_at_track_start() {
    let sheet = LyricSheet::parse(SHEET).unwrap();
    assert_eq!(sheet.current_index(0.0, 60.0), Some(0));
    assert_eq!(sheet.current_line(0.0, 60.0), Some("First line"));
}

#[test]
fn index_is_monotonic_and_reaches_the_last_line() {
    let sheet = LyricSheet::parse(SHEET).unwrap();
    let duration = 30.0;

    let mut last = 0usize;
    for step in 0..400 {
        let t = step as f32 * 0.1;
        let idx = sheet.current_index(t, duration).expect("line expected");
        assert!(idx >= last, "index regressed at t={t}: {last} -> {idx}");
        assert!(idx < sheet.line_count());
        last = idx;
    }
    assert_eq!(last, sheet.line_count() - 1, "never reached the last line");
}

#[test]
fn last_line_holds_past_the_track_end() {
    let sheet = LyricSheet::parse(SHEET).unwrap();
    assert_eq!(sheet.current_index(500.0, 30.0), Some(3));
}

#[test]
fn invalid_duration_yields_no_line() {
    let sheet = LyricSheet::parse(SHEET).unwrap();
    assert_eq!(sheet.current_index(10.0, 0.0), None);
    assert_eq!(sheet.current_index(10.0, -5.0), None);
    assert_eq!(sheet.current_index(10.0, f32::NAN), None);
}

#[test]
fn natural_duration_scales_with_line_count() {
    let sheet = LyricSheet::parse(SHEET).unwrap();
    // start offset + cadence per line + tail hold
    let expected = 1.5 + 4.0 * 2.4 + 1.5;
    assert!((sheet.natural_duration_s() - expected).abs() < 1e-4);
}
