//! Canonical text output for board objects
//!
//! Fields are always written in the order below regardless of how the
//! object was built. Lengths print as millimetres.

use super::types::{At, Board, Drawing, Footprint, Layer, Net, Pad, Property, Shape, Stroke, TitleBlock, Zone};
use crate::config::FormatOptions;
use crate::geometry::{Outline, Point};
use crate::sexpr::{
    classify_word, format_double, format_iu, quoted, quoted_field, xy_field, FormatSexpr, Formatter, TokenKind,
};

/// Bare word when it reads back as the same atom, quoted otherwise
fn symbol(word: &str) -> String {
    let plain = !word.is_empty()
        && !word.starts_with('#')
        && word.chars().all(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '"' | '\\'))
        && classify_word(word) == TokenKind::Atom;
    if plain {
        word.to_string()
    } else {
        quoted(word)
    }
}

fn point_field(keyword: &str, p: Point) -> String {
    xy_field(keyword, p.x, p.y)
}

fn at_field(at: &At) -> String {
    if at.angle == 0.0 {
        xy_field("at", at.x, at.y)
    } else {
        format!("(at {} {} {})", format_iu(at.x), format_iu(at.y), format_double(at.angle))
    }
}

fn stroke_field(stroke: &Stroke) -> String {
    match &stroke.style {
        Some(style) => format!("(stroke (width {}) (type {}))", format_iu(stroke.width), symbol(style)),
        None => format!("(stroke (width {}))", format_iu(stroke.width)),
    }
}

fn quoted_list(keyword: &str, items: &[String]) -> String {
    let parts: Vec<String> = items.iter().map(|s| quoted(s)).collect();
    format!("({} {})", keyword, parts.join(" "))
}

/// Point list items; an arc edge consumes the vertex it ends on
fn pts_items(outline: &Outline) -> Vec<String> {
    let n = outline.len();
    let mut items = Vec::with_capacity(n);
    let mut end_written = false;
    for i in 0..n {
        let v = &outline.vertices[i];
        match &v.arc {
            Some(tag) => {
                let end = outline.vertices[(i + 1) % n].pos;
                items.push(format!(
                    "(arc {} {} {})",
                    point_field("start", v.pos),
                    point_field("mid", tag.mid),
                    point_field("end", end)
                ));
                end_written = true;
            }
            None => {
                if !end_written {
                    items.push(point_field("xy", v.pos));
                }
                end_written = false;
            }
        }
    }
    items
}

fn write_pts(out: &mut Formatter, nest: usize, outline: &Outline) {
    out.print(nest, "(pts");
    out.print_wrapped(nest + 1, &pts_items(outline));
    out.print(nest, ")");
}

fn write_drawing(out: &mut Formatter, nest: usize, prefix: &str, drawing: &Drawing) {
    out.print(nest, &format!("({}_{}", prefix, drawing.shape.suffix()));
    match &drawing.shape {
        Shape::Line { start, end } | Shape::Rect { start, end } => {
            out.print(nest + 1, &point_field("start", *start));
            out.print(nest + 1, &point_field("end", *end));
        }
        Shape::Circle { center, end } => {
            out.print(nest + 1, &point_field("center", *center));
            out.print(nest + 1, &point_field("end", *end));
        }
        Shape::Arc { start, mid, end } => {
            out.print(nest + 1, &point_field("start", *start));
            out.print(nest + 1, &point_field("mid", *mid));
            out.print(nest + 1, &point_field("end", *end));
        }
        Shape::Poly { outline } => write_pts(out, nest + 1, outline),
    }
    if let Some(stroke) = &drawing.stroke {
        out.print(nest + 1, &stroke_field(stroke));
    }
    if let Some(fill) = &drawing.fill {
        out.print(nest + 1, &format!("(fill {})", symbol(fill)));
    }
    out.print(nest + 1, &quoted_field("layer", &drawing.layer));
    if let Some(uuid) = &drawing.uuid {
        out.print(nest + 1, &quoted_field("uuid", uuid));
    }
    out.print(nest, ")");
}

impl FormatSexpr for Drawing {
    fn format(&self, out: &mut Formatter, nest: usize) {
        write_drawing(out, nest, "gr", self);
    }
}

impl FormatSexpr for Net {
    fn format(&self, out: &mut Formatter, nest: usize) {
        out.print(nest, &format!("(net {} {})", self.code, quoted(&self.name)));
    }
}

impl FormatSexpr for Layer {
    fn format(&self, out: &mut Formatter, nest: usize) {
        let mut line = format!("({} {} {}", self.ordinal, quoted(&self.canonical_name), symbol(&self.layer_type));
        if let Some(user) = &self.user_name {
            line.push(' ');
            line.push_str(&quoted(user));
        }
        line.push(')');
        out.print(nest, &line);
    }
}

impl FormatSexpr for TitleBlock {
    fn format(&self, out: &mut Formatter, nest: usize) {
        out.print(nest, "(title_block");
        let fields = [("title", &self.title), ("date", &self.date), ("rev", &self.rev), ("company", &self.company)];
        for (keyword, value) in fields {
            if let Some(v) = value {
                out.print(nest + 1, &quoted_field(keyword, v));
            }
        }
        for (index, comment) in &self.comments {
            out.print(nest + 1, &format!("(comment {} {})", index, quoted(comment)));
        }
        out.print(nest, ")");
    }
}

impl FormatSexpr for Property {
    fn format(&self, out: &mut Formatter, nest: usize) {
        let head = format!("(property {} {}", quoted(&self.key), quoted(&self.value));
        if self.at.is_none() && self.layer.is_none() && self.uuid.is_none() {
            out.print(nest, &format!("{})", head));
            return;
        }
        out.print(nest, &head);
        if let Some(at) = &self.at {
            out.print(nest + 1, &at_field(at));
        }
        if let Some(layer) = &self.layer {
            out.print(nest + 1, &quoted_field("layer", layer));
        }
        if let Some(uuid) = &self.uuid {
            out.print(nest + 1, &quoted_field("uuid", uuid));
        }
        out.print(nest, ")");
    }
}

impl FormatSexpr for Pad {
    fn format(&self, out: &mut Formatter, nest: usize) {
        out.print(
            nest,
            &format!("(pad {} {} {}", quoted(&self.number), symbol(&self.pad_type), symbol(&self.shape)),
        );
        out.print(nest + 1, &at_field(&self.at));
        out.print(nest + 1, &xy_field("size", self.size.0, self.size.1));
        if let Some(drill) = &self.drill {
            let mut text = String::from("(drill");
            if drill.oval {
                text.push_str(" oval");
            }
            text.push(' ');
            text.push_str(&format_iu(drill.width));
            if let Some(h) = drill.height {
                text.push(' ');
                text.push_str(&format_iu(h));
            }
            text.push(')');
            out.print(nest + 1, &text);
        }
        out.print(nest + 1, &quoted_list("layers", &self.layers));
        if let Some(ratio) = self.roundrect_rratio {
            out.print(nest + 1, &format!("(roundrect_rratio {})", format_double(ratio)));
        }
        if let Some(net) = &self.net {
            net.format(out, nest + 1);
        }
        if let Some(uuid) = &self.uuid {
            out.print(nest + 1, &quoted_field("uuid", uuid));
        }
        out.print(nest, ")");
    }
}

impl FormatSexpr for Footprint {
    fn format(&self, out: &mut Formatter, nest: usize) {
        out.print(nest, &format!("(footprint {}", quoted(&self.lib_id)));
        out.print(nest + 1, &quoted_field("layer", &self.layer));
        if let Some(uuid) = &self.uuid {
            out.print(nest + 1, &quoted_field("uuid", uuid));
        }
        out.print(nest + 1, &at_field(&self.at));
        if !self.attr.is_empty() {
            let attrs: Vec<String> = self.attr.iter().map(|a| symbol(a)).collect();
            out.print(nest + 1, &format!("(attr {})", attrs.join(" ")));
        }
        for property in &self.properties {
            property.format(out, nest + 1);
        }
        for drawing in &self.drawings {
            write_drawing(out, nest + 1, "fp", drawing);
        }
        for pad in &self.pads {
            pad.format(out, nest + 1);
        }
        out.print(nest, ")");
    }
}

impl FormatSexpr for Zone {
    fn format(&self, out: &mut Formatter, nest: usize) {
        out.print(nest, "(zone");
        out.print(nest + 1, &format!("(net {})", self.net));
        out.print(nest + 1, &quoted_field("net_name", &self.net_name));
        if self.layers.len() == 1 {
            out.print(nest + 1, &quoted_field("layer", &self.layers[0]));
        } else {
            out.print(nest + 1, &quoted_list("layers", &self.layers));
        }
        if let Some(uuid) = &self.uuid {
            out.print(nest + 1, &quoted_field("uuid", uuid));
        }
        if let Some(name) = &self.name {
            out.print(nest + 1, &quoted_field("name", name));
        }
        if let Some(priority) = self.priority {
            out.print(nest + 1, &format!("(priority {})", priority));
        }
        if let Some(t) = self.min_thickness {
            out.print(nest + 1, &format!("(min_thickness {})", format_iu(t)));
        }
        for poly in &self.outline.polygons {
            out.print(nest + 1, "(polygon");
            for contour in poly.contours() {
                write_pts(out, nest + 2, contour);
            }
            out.print(nest + 1, ")");
        }
        for fill in &self.fills {
            for poly in &fill.polygons.polygons {
                out.print(nest + 1, "(filled_polygon");
                out.print(nest + 2, &quoted_field("layer", &fill.layer));
                for contour in poly.contours() {
                    write_pts(out, nest + 2, contour);
                }
                out.print(nest + 1, ")");
            }
        }
        out.print(nest, ")");
    }
}

impl FormatSexpr for Board {
    fn format(&self, out: &mut Formatter, nest: usize) {
        out.print(nest, "(kicad_pcb");
        out.print(nest + 1, &format!("(version {})", self.version));
        if let Some(generator) = &self.generator {
            out.print(nest + 1, &quoted_field("generator", generator));
        }
        if let Some(v) = &self.generator_version {
            out.print(nest + 1, &quoted_field("generator_version", v));
        }
        if let Some(thickness) = self.thickness {
            out.print(nest + 1, "(general");
            out.print(nest + 2, &format!("(thickness {})", format_iu(thickness)));
            out.print(nest + 1, ")");
        }
        if let Some(paper) = &self.paper {
            out.print(nest + 1, &quoted_field("paper", paper));
        }
        if let Some(tb) = &self.title_block {
            tb.format(out, nest + 1);
        }
        if !self.layers.is_empty() {
            out.print(nest + 1, "(layers");
            for layer in &self.layers {
                layer.format(out, nest + 2);
            }
            out.print(nest + 1, ")");
        }
        for net in &self.nets {
            net.format(out, nest + 1);
        }
        for fp in &self.footprints {
            fp.format(out, nest + 1);
        }
        for drawing in &self.drawings {
            drawing.format(out, nest + 1);
        }
        for zone in &self.zones {
            zone.format(out, nest + 1);
        }
        out.print(nest, ")");
    }
}

/// Whole document text for `board`
pub fn format_board(board: &Board, options: &FormatOptions) -> String {
    let mut out = Formatter::with_options(options);
    board.format(&mut out, 0);
    let text = out.finish();
    log::debug!("formatted board: {} bytes", text.len());
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ArcTag;

    #[test]
    fn test_symbol_quotes_when_needed() {
        assert_eq!(symbol("solid"), "solid");
        assert_eq!(symbol("two words"), "\"two words\"");
        assert_eq!(symbol("12"), "\"12\"");
        assert_eq!(symbol(""), "\"\"");
    }

    #[test]
    fn test_net_and_layer_lines() {
        let mut out = Formatter::new();
        Net { code: 0, name: String::new() }.format(&mut out, 1);
        Layer {
            ordinal: 9,
            canonical_name: "F.Adhes".into(),
            layer_type: "user".into(),
            user_name: Some("F.Adhesive".into()),
        }
        .format(&mut out, 1);
        assert_eq!(out.finish(), "  (net 0 \"\")\n  (9 \"F.Adhes\" user \"F.Adhesive\")\n");
    }

    #[test]
    fn test_pts_arc_consumes_end_vertex() {
        let mut outline = Outline::from_points([
            Point::new(0, 0),
            Point::new(1_000_000, 0),
            Point::new(1_000_000, 1_000_000),
        ]);
        outline.vertices[0].arc = ArcTag::through(Point::new(0, 0), Point::new(500_000, -200_000), Point::new(1_000_000, 0));
        let items = pts_items(&outline);
        assert_eq!(
            items,
            vec![
                "(arc (start 0 0) (mid 0.5 -0.2) (end 1 0))".to_string(),
                "(xy 1 1)".to_string(),
            ]
        );
    }

    #[test]
    fn test_drawing_field_order() {
        let drawing = Drawing {
            shape: Shape::Line { start: Point::new(0, 0), end: Point::new(2_500_000, 0) },
            stroke: Some(Stroke { width: 100_000, style: Some("solid".into()) }),
            fill: None,
            layer: "Edge.Cuts".into(),
            uuid: Some("a-b".into()),
        };
        let mut out = Formatter::new();
        drawing.format(&mut out, 0);
        assert_eq!(
            out.finish(),
            "(gr_line\n  (start 0 0)\n  (end 2.5 0)\n  (stroke (width 0.1) (type solid))\n  (layer \"Edge.Cuts\")\n  (uuid \"a-b\")\n)\n"
        );
    }
}
