use crate::config::NodeConfig;
use crate::text_metrics::FontMetrics;

/// A run of characters sharing one style within a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

/// Split node text into styled per-line segments. `**` toggles bold, `_`
/// toggles italic; both markers are consumed, and style state carries across
/// line breaks so multi-line spans are legal. A line that ends up with no
/// segments yields a single space segment carrying the line's starting style,
/// so every line has a measurable height.
pub fn parse_formatted_lines(text: &str) -> Vec<Vec<Segment>> {
    let mut parsed = Vec::new();
    let mut bold = false;
    let mut italic = false;
    for raw in text.split('\n') {
        let mut segments: Vec<Segment> = Vec::new();
        let mut buf = String::new();
        let line_start = (bold, italic);
        let chars: Vec<char> = raw.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '*' && i + 1 < chars.len() && chars[i + 1] == '*' {
                if !buf.is_empty() {
                    segments.push(Segment {
                        text: std::mem::take(&mut buf),
                        bold,
                        italic,
                    });
                }
                bold = !bold;
                i += 2;
                continue;
            }
            if chars[i] == '_' {
                if !buf.is_empty() {
                    segments.push(Segment {
                        text: std::mem::take(&mut buf),
                        bold,
                        italic,
                    });
                }
                italic = !italic;
                i += 1;
                continue;
            }
            buf.push(chars[i]);
            i += 1;
        }
        if !buf.is_empty() {
            segments.push(Segment { text: buf, bold, italic });
        }
        if segments.is_empty() {
            segments.push(Segment {
                text: " ".to_string(),
                bold: line_start.0,
                italic: line_start.1,
            });
        }
        parsed.push(segments);
    }
    parsed
}

/// Logical node size for the given text: widest line plus side padding by
/// summed line heights plus inter-line gaps and vertical padding, floored at
/// the configured minimum node size.
pub fn measure_node(text: &str, metrics: &dyn FontMetrics, node: &NodeConfig) -> (f32, f32) {
    let parsed = parse_formatted_lines(if text.is_empty() { " " } else { text });

    let mut max_width = 0.0f32;
    let mut total_height = 0.0f32;
    for line in &parsed {
        let line_height = line
            .iter()
            .map(|seg| metrics.line_height(seg.bold, seg.italic))
            .fold(0.0f32, f32::max);
        let line_width: f32 = line
            .iter()
            .map(|seg| metrics.segment_width(&seg.text, seg.bold, seg.italic))
            .sum();
        max_width = max_width.max(line_width);
        total_height += line_height;
    }
    total_height += node.line_gap * (parsed.len().saturating_sub(1)) as f32;

    let width = max_width + node.padding_side * 2.0;
    let height = total_height + node.padding_top + node.padding_bottom;
    (width.max(node.base_width), height.max(node.base_height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_metrics::FixedMetrics;

    fn flat(line: &[Segment]) -> Vec<(&str, bool, bool)> {
        line.iter()
            .map(|seg| (seg.text.as_str(), seg.bold, seg.italic))
            .collect()
    }

    #[test]
    fn plain_text_is_one_segment() {
        let parsed = parse_formatted_lines("hello");
        assert_eq!(parsed.len(), 1);
        assert_eq!(flat(&parsed[0]), vec![("hello", false, false)]);
    }

    #[test]
    fn bold_and_italic_markers_are_consumed() {
        let parsed = parse_formatted_lines("a**b**_c_");
        assert_eq!(
            flat(&parsed[0]),
            vec![("a", false, false), ("b", true, false), ("c", false, true)]
        );
    }

    #[test]
    fn style_state_spans_lines() {
        let parsed = parse_formatted_lines("**first\nsecond**");
        assert_eq!(flat(&parsed[0]), vec![("first", true, false)]);
        assert_eq!(flat(&parsed[1]), vec![("second", true, false)]);
    }

    #[test]
    fn empty_line_gets_styled_space() {
        let parsed = parse_formatted_lines("**a\n\nb**");
        assert_eq!(flat(&parsed[1]), vec![(" ", true, false)]);
    }

    #[test]
    fn lone_marker_line_keeps_starting_style() {
        let parsed = parse_formatted_lines("_");
        assert_eq!(flat(&parsed[0]), vec![(" ", false, false)]);
    }

    #[test]
    fn measure_floors_at_base_size() {
        let node = NodeConfig::default();
        let metrics = FixedMetrics::default();
        let (w, h) = measure_node("x", &metrics, &node);
        assert_eq!(w, node.base_width);
        assert_eq!(h, node.base_height);
    }

    #[test]
    fn measure_grows_with_lines_and_width() {
        let node = NodeConfig::default();
        let metrics = FixedMetrics::default();
        let long: String = "m".repeat(60);
        let (w, _) = measure_node(&long, &metrics, &node);
        assert!(w > node.base_width);

        let tall = "a\nb\nc\nd\ne\nf";
        let (_, h) = measure_node(tall, &metrics, &node);
        let expected = 6.0 * metrics.line_height + 5.0 * node.line_gap
            + node.padding_top
            + node.padding_bottom;
        assert!((h - expected.max(node.base_height)).abs() < 1e-3);
    }

    #[test]
    fn bold_line_is_wider_than_plain() {
        let node = NodeConfig::default();
        let metrics = FixedMetrics::default();
        let text: String = "w".repeat(40);
        let (plain, _) = measure_node(&text, &metrics, &node);
        let (bold, _) = measure_node(&format!("**{text}**"), &metrics, &node);
        assert!(bold > plain);
    }
}
