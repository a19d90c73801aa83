//! Grammar-driven board parser
//!
//! Walks an S-expression tree and builds [`Board`] objects. Each object kind
//! has a [`Schema`]: a table of the keywords it understands plus a flag that
//! says whether unknown keywords are skipped with a warning (extensible) or
//! rejected (fixed). Top-level board items go through one keyword table.

use super::types::{At, Board, Drawing, Drill, Footprint, Layer, Net, Pad, Property, Shape, Stroke, TitleBlock, Zone, ZoneFill};
use crate::config::ParseOptions;
use crate::error::ParseError;
use crate::geometry::{ArcTag, Outline, Point, Polygon, PolygonSet, Vertex};
use crate::report::{emit, ProgressReporter, Reporter, Severity};
use crate::sexpr::{self, inline_text, Node, NumericScope, IU_PER_MM};

/// One keyword an object accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub keyword: &'static str,
    pub required: bool,
}

const fn req(keyword: &'static str) -> FieldSpec {
    FieldSpec { keyword, required: true }
}

const fn opt(keyword: &'static str) -> FieldSpec {
    FieldSpec { keyword, required: false }
}

/// Field table of one object kind
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    /// Unknown keywords are skipped with a warning instead of failing
    pub extensible: bool,
    pub fields: &'static [FieldSpec],
}

const GENERAL: Schema = Schema { extensible: true, fields: &[opt("thickness")] };

const TITLE_BLOCK: Schema = Schema {
    extensible: false,
    fields: &[opt("title"), opt("date"), opt("rev"), opt("company"), opt("comment")],
};

const STROKE: Schema = Schema { extensible: false, fields: &[req("width"), opt("type")] };

const PTS: Schema = Schema { extensible: false, fields: &[opt("xy"), opt("arc")] };

const PTS_ARC: Schema = Schema { extensible: false, fields: &[req("start"), req("mid"), req("end")] };

const LINE: Schema = Schema {
    extensible: true,
    fields: &[req("start"), req("end"), opt("stroke"), req("layer"), opt("uuid")],
};

const RECT: Schema = Schema {
    extensible: true,
    fields: &[req("start"), req("end"), opt("stroke"), opt("fill"), req("layer"), opt("uuid")],
};

const CIRCLE: Schema = Schema {
    extensible: true,
    fields: &[req("center"), req("end"), opt("stroke"), opt("fill"), req("layer"), opt("uuid")],
};

const ARC: Schema = Schema {
    extensible: true,
    fields: &[req("start"), req("mid"), req("end"), opt("stroke"), req("layer"), opt("uuid")],
};

const POLY: Schema = Schema {
    extensible: true,
    fields: &[req("pts"), opt("stroke"), opt("fill"), req("layer"), opt("uuid")],
};

const FOOTPRINT: Schema = Schema {
    extensible: true,
    fields: &[
        req("layer"),
        opt("uuid"),
        req("at"),
        opt("attr"),
        opt("property"),
        opt("fp_line"),
        opt("fp_rect"),
        opt("fp_circle"),
        opt("fp_arc"),
        opt("fp_poly"),
        opt("pad"),
    ],
};

const PROPERTY: Schema = Schema { extensible: true, fields: &[opt("at"), opt("layer"), opt("uuid")] };

const PAD: Schema = Schema {
    extensible: true,
    fields: &[
        req("at"),
        req("size"),
        opt("drill"),
        req("layers"),
        opt("roundrect_rratio"),
        opt("net"),
        opt("uuid"),
    ],
};

const DRILL: Schema = Schema { extensible: true, fields: &[] };

const ZONE: Schema = Schema {
    extensible: true,
    fields: &[
        req("net"),
        req("net_name"),
        opt("layer"),
        opt("layers"),
        opt("uuid"),
        opt("name"),
        opt("priority"),
        opt("min_thickness"),
        opt("polygon"),
        opt("filled_polygon"),
    ],
};

const ZONE_POLYGON: Schema = Schema { extensible: false, fields: &[req("pts")] };

const FILLED_POLYGON: Schema = Schema { extensible: true, fields: &[req("layer"), req("pts")] };

type ItemParser = fn(&mut ParseContext<'_>, &Node, &mut Board) -> Result<(), ParseError>;

/// Keyword table for the children of `kicad_pcb`
const BOARD_ITEMS: &[(FieldSpec, ItemParser)] = &[
    (req("version"), item_version),
    (opt("generator"), item_generator),
    (opt("generator_version"), item_generator_version),
    (opt("general"), item_general),
    (opt("paper"), item_paper),
    (opt("title_block"), item_title_block),
    (opt("layers"), item_layers),
    (opt("net"), item_net),
    (opt("footprint"), item_footprint),
    (opt("gr_line"), item_drawing),
    (opt("gr_rect"), item_drawing),
    (opt("gr_circle"), item_drawing),
    (opt("gr_arc"), item_drawing),
    (opt("gr_poly"), item_drawing),
    (opt("zone"), item_zone),
];

/// Convert millimetres to IU, clamping to `±limit`.
/// Returns the value and whether it was clamped.
pub fn board_units(mm: f64, limit: f64) -> (i64, bool) {
    let iu = mm * IU_PER_MM;
    if iu > limit {
        (limit.round() as i64, true)
    } else if iu < -limit {
        (-(limit.round() as i64), true)
    } else {
        (iu.round() as i64, false)
    }
}

fn syntax(node: &Node, message: impl Into<String>) -> ParseError {
    ParseError::syntax(node.line, node.column, message)
}

fn head_of(node: &Node) -> &str {
    node.head().unwrap_or("?")
}

fn expect_head(node: &Node, keyword: &str) -> Result<(), ParseError> {
    match node.head() {
        Some(h) if h == keyword => Ok(()),
        Some(h) => Err(syntax(node, format!("expected '{}', found '{}'", keyword, h))),
        None => Err(syntax(node, format!("expected '({}'", keyword))),
    }
}

/// Arguments of `node`, which must number exactly `n`
fn exact_args(node: &Node, n: usize) -> Result<&[Node], ParseError> {
    let args = node.args();
    if args.len() < n {
        return Err(syntax(
            node,
            format!("'{}' expects {} value(s), found {}", head_of(node), n, args.len()),
        ));
    }
    if args.len() > n {
        return Err(syntax(
            &args[n],
            format!("unexpected '{}' in '{}'", inline_text(&args[n]), head_of(node)),
        ));
    }
    Ok(args)
}

fn number(node: &Node) -> Result<f64, ParseError> {
    node.as_f64()
        .ok_or_else(|| syntax(node, format!("expected a number, found '{}'", inline_text(node))))
}

fn integer(node: &Node) -> Result<i64, ParseError> {
    node.as_i64()
        .ok_or_else(|| syntax(node, format!("expected an integer, found '{}'", inline_text(node))))
}

fn text(node: &Node) -> Result<String, ParseError> {
    node.as_str()
        .map(str::to_string)
        .ok_or_else(|| syntax(node, format!("expected a string, found '{}'", inline_text(node))))
}

fn single_text(node: &Node) -> Result<String, ParseError> {
    text(&exact_args(node, 1)?[0])
}

fn single_integer(node: &Node) -> Result<i64, ParseError> {
    integer(&exact_args(node, 1)?[0])
}

fn all_text(node: &Node) -> Result<Vec<String>, ParseError> {
    node.args().iter().map(text).collect()
}

/// Per-parse state: options, the optional reporter and counters
pub(crate) struct ParseContext<'r> {
    options: ParseOptions,
    reporter: Option<&'r mut dyn Reporter>,
    clamped: usize,
    skipped: usize,
}

impl<'r> ParseContext<'r> {
    pub(crate) fn new(options: &ParseOptions, reporter: Option<&'r mut dyn Reporter>) -> Self {
        Self { options: options.clone(), reporter, clamped: 0, skipped: 0 }
    }

    fn skip_unknown(&mut self, owner: &str, what: &str, node: &Node) {
        self.skipped += 1;
        log::debug!("skipping '{}' in '{}' at line {}", what, owner, node.line);
        if self.options.warn_on_unknown {
            let message = format!(
                "line {}, column {}: skipped unknown '{}' in '{}'",
                node.line, node.column, what, owner
            );
            emit(&mut self.reporter, &message, Severity::Warning);
        }
    }

    /// Length in mm converted to IU, clamped with a warning when out of range
    fn length(&mut self, node: &Node) -> Result<i64, ParseError> {
        let mm = number(node)?;
        let (iu, clamped) = board_units(mm, self.options.coordinate_limit());
        if clamped {
            self.clamped += 1;
            let message = format!(
                "line {}, column {}: value {} mm out of range, clamped to {} IU",
                node.line, node.column, mm, iu
            );
            log::warn!("{}", message);
            emit(&mut self.reporter, &message, Severity::Warning);
        }
        Ok(iu)
    }

    fn single_length(&mut self, node: &Node) -> Result<i64, ParseError> {
        let args = exact_args(node, 1)?;
        self.length(&args[0])
    }

    /// `(keyword x y)`
    fn xy(&mut self, node: &Node) -> Result<Point, ParseError> {
        let args = exact_args(node, 2)?;
        Ok(Point::new(self.length(&args[0])?, self.length(&args[1])?))
    }

    /// `(at x y [angle])`
    fn at(&mut self, node: &Node) -> Result<At, ParseError> {
        let args = node.args();
        let n = args.len().clamp(2, 3);
        let args = exact_args(node, n)?;
        let mut at = At::new(self.length(&args[0])?, self.length(&args[1])?);
        if n == 3 {
            at.angle = number(&args[2])?;
        }
        Ok(at)
    }

    /// Visit the keyword lists of `node` after `skip` positional values,
    /// enforcing `schema`. `handle` sees every known keyword.
    fn walk<'n>(
        &mut self,
        node: &'n Node,
        schema: &Schema,
        skip: usize,
        mut handle: impl FnMut(&mut Self, &'n str, &'n Node) -> Result<(), ParseError>,
    ) -> Result<(), ParseError> {
        let owner = head_of(node);
        let mut seen: Vec<&'static str> = Vec::new();

        for child in node.args().iter().skip(skip) {
            let keyword = match child.head() {
                Some(k) => k,
                None if schema.extensible => {
                    self.skip_unknown(owner, &inline_text(child), child);
                    continue;
                }
                None => {
                    return Err(syntax(
                        child,
                        format!("unexpected '{}' in '{}'", inline_text(child), owner),
                    ));
                }
            };
            match schema.fields.iter().find(|f| f.keyword == keyword) {
                Some(field) => {
                    seen.push(field.keyword);
                    handle(self, keyword, child)?;
                }
                None if schema.extensible => self.skip_unknown(owner, keyword, child),
                None => {
                    return Err(syntax(child, format!("unknown keyword '{}' in '{}'", keyword, owner)));
                }
            }
        }

        if let Some(missing) = schema.fields.iter().find(|f| f.required && !seen.contains(&f.keyword)) {
            return Err(syntax(
                node,
                format!("missing required field '{}' in '{}'", missing.keyword, owner),
            ));
        }
        Ok(())
    }

    fn stroke(&mut self, node: &Node) -> Result<Stroke, ParseError> {
        let mut stroke = Stroke { width: 0, style: None };
        self.walk(node, &STROKE, 0, |ctx, kw, child| {
            match kw {
                "width" => stroke.width = ctx.single_length(child)?,
                "type" => stroke.style = Some(single_text(child)?),
                _ => {}
            }
            Ok(())
        })?;
        Ok(stroke)
    }

    /// `(pts (xy x y) (arc (start ..) (mid ..) (end ..)) ...)`
    fn pts(&mut self, node: &Node) -> Result<Outline, ParseError> {
        let mut outline = Outline::new();
        self.walk(node, &PTS, 0, |ctx, kw, child| {
            match kw {
                "xy" => {
                    let p = ctx.xy(child)?;
                    outline.push(p);
                }
                "arc" => {
                    let (mut start, mut mid, mut end) = (Point::default(), Point::default(), Point::default());
                    ctx.walk(child, &PTS_ARC, 0, |ctx, kw, c| {
                        let p = ctx.xy(c)?;
                        match kw {
                            "start" => start = p,
                            "mid" => mid = p,
                            _ => end = p,
                        }
                        Ok(())
                    })?;
                    let tag = ArcTag::through(start, mid, end);
                    if tag.is_none() {
                        emit(
                            &mut ctx.reporter,
                            &format!("line {}: degenerate arc stored as a straight edge", child.line),
                            Severity::Warning,
                        );
                    }
                    match outline.vertices.last_mut() {
                        Some(last) if last.pos == start => last.arc = tag,
                        _ => outline.vertices.push(Vertex { pos: start, arc: tag }),
                    }
                    outline.push(end);
                }
                _ => {}
            }
            Ok(())
        })?;

        let n = outline.vertices.len();
        if n > 1 && outline.vertices[0].pos == outline.vertices[n - 1].pos && outline.vertices[n - 1].arc.is_none() {
            log::debug!("dropping closing point repeated at line {}", node.line);
            outline.vertices.pop();
        }
        Ok(outline)
    }

    fn drawing(&mut self, node: &Node) -> Result<Drawing, ParseError> {
        let kind = head_of(node);
        let suffix = kind
            .strip_prefix("gr_")
            .or_else(|| kind.strip_prefix("fp_"))
            .unwrap_or(kind);
        let schema = match suffix {
            "line" => &LINE,
            "rect" => &RECT,
            "circle" => &CIRCLE,
            "arc" => &ARC,
            "poly" => &POLY,
            _ => return Err(syntax(node, format!("unknown graphic item '{}'", kind))),
        };

        let mut points: [Point; 3] = [Point::default(); 3];
        let mut outline = Outline::new();
        let mut drawing = Drawing {
            shape: Shape::Line { start: Point::default(), end: Point::default() },
            stroke: None,
            fill: None,
            layer: String::new(),
            uuid: None,
        };

        self.walk(node, schema, 0, |ctx, kw, child| {
            match kw {
                "start" | "center" => points[0] = ctx.xy(child)?,
                "mid" => points[1] = ctx.xy(child)?,
                "end" => points[2] = ctx.xy(child)?,
                "pts" => outline = ctx.pts(child)?,
                "stroke" => drawing.stroke = Some(ctx.stroke(child)?),
                "fill" => drawing.fill = Some(single_text(child)?),
                "layer" => drawing.layer = single_text(child)?,
                "uuid" => drawing.uuid = Some(single_text(child)?),
                _ => {}
            }
            Ok(())
        })?;

        let [a, m, b] = points;
        drawing.shape = match suffix {
            "line" => Shape::Line { start: a, end: b },
            "rect" => Shape::Rect { start: a, end: b },
            "circle" => Shape::Circle { center: a, end: b },
            "arc" => Shape::Arc { start: a, mid: m, end: b },
            _ => Shape::Poly { outline },
        };
        Ok(drawing)
    }

    fn net(&mut self, node: &Node) -> Result<Net, ParseError> {
        let args = exact_args(node, 2)?;
        Ok(Net { code: integer(&args[0])?, name: text(&args[1])? })
    }

    fn property(&mut self, node: &Node) -> Result<Property, ParseError> {
        let args = node.args();
        if args.len() < 2 {
            return Err(syntax(node, "'property' expects a key and a value"));
        }
        let mut property = Property {
            key: text(&args[0])?,
            value: text(&args[1])?,
            at: None,
            layer: None,
            uuid: None,
        };
        self.walk(node, &PROPERTY, 2, |ctx, kw, child| {
            match kw {
                "at" => property.at = Some(ctx.at(child)?),
                "layer" => property.layer = Some(single_text(child)?),
                "uuid" => property.uuid = Some(single_text(child)?),
                _ => {}
            }
            Ok(())
        })?;
        Ok(property)
    }

    /// `(drill d)` or `(drill oval w h)`
    fn drill(&mut self, node: &Node) -> Result<Drill, ParseError> {
        let args = node.args();
        let oval = args.first().and_then(Node::as_str) == Some("oval");
        let values: Vec<&Node> = args.iter().skip(usize::from(oval)).take_while(|n| !n.is_list()).collect();
        if values.is_empty() || values.len() > 2 {
            return Err(syntax(node, "'drill' expects one or two sizes"));
        }
        let drill = Drill {
            oval,
            width: self.length(values[0])?,
            height: values.get(1).map(|n| self.length(n)).transpose()?,
        };
        self.walk(node, &DRILL, usize::from(oval) + values.len(), |_, _, _| Ok(()))?;
        Ok(drill)
    }

    fn pad(&mut self, node: &Node) -> Result<Pad, ParseError> {
        let args = node.args();
        if args.len() < 3 || args[..3].iter().any(Node::is_list) {
            return Err(syntax(node, "'pad' expects a number, a type and a shape"));
        }
        let mut pad = Pad {
            number: text(&args[0])?,
            pad_type: text(&args[1])?,
            shape: text(&args[2])?,
            at: At::default(),
            size: (0, 0),
            drill: None,
            layers: Vec::new(),
            roundrect_rratio: None,
            net: None,
            uuid: None,
        };
        self.walk(node, &PAD, 3, |ctx, kw, child| {
            match kw {
                "at" => pad.at = ctx.at(child)?,
                "size" => {
                    let p = ctx.xy(child)?;
                    pad.size = (p.x, p.y);
                }
                "drill" => pad.drill = Some(ctx.drill(child)?),
                "layers" => pad.layers = all_text(child)?,
                "roundrect_rratio" => pad.roundrect_rratio = Some(number(&exact_args(child, 1)?[0])?),
                "net" => pad.net = Some(ctx.net(child)?),
                "uuid" => pad.uuid = Some(single_text(child)?),
                _ => {}
            }
            Ok(())
        })?;
        Ok(pad)
    }

    fn footprint(&mut self, node: &Node) -> Result<Footprint, ParseError> {
        let lib_id = match node.args().first() {
            Some(n) if !n.is_list() => text(n)?,
            _ => return Err(syntax(node, "'footprint' expects a library id")),
        };
        let mut fp = Footprint {
            lib_id,
            layer: String::new(),
            uuid: None,
            at: At::default(),
            attr: Vec::new(),
            properties: Vec::new(),
            drawings: Vec::new(),
            pads: Vec::new(),
        };
        self.walk(node, &FOOTPRINT, 1, |ctx, kw, child| {
            match kw {
                "layer" => fp.layer = single_text(child)?,
                "uuid" => fp.uuid = Some(single_text(child)?),
                "at" => fp.at = ctx.at(child)?,
                "attr" => fp.attr = all_text(child)?,
                "property" => fp.properties.push(ctx.property(child)?),
                "pad" => fp.pads.push(ctx.pad(child)?),
                _ => fp.drawings.push(ctx.drawing(child)?),
            }
            Ok(())
        })?;
        Ok(fp)
    }

    fn zone(&mut self, node: &Node) -> Result<Zone, ParseError> {
        let mut zone = Zone {
            net: 0,
            net_name: String::new(),
            layers: Vec::new(),
            uuid: None,
            name: None,
            priority: None,
            min_thickness: None,
            outline: PolygonSet::new(),
            fills: Vec::new(),
        };
        self.walk(node, &ZONE, 0, |ctx, kw, child| {
            match kw {
                "net" => zone.net = single_integer(child)?,
                "net_name" => zone.net_name = single_text(child)?,
                "layer" => zone.layers = vec![single_text(child)?],
                "layers" => zone.layers = all_text(child)?,
                "uuid" => zone.uuid = Some(single_text(child)?),
                "name" => zone.name = Some(single_text(child)?),
                "priority" => zone.priority = Some(single_integer(child)?),
                "min_thickness" => zone.min_thickness = Some(ctx.single_length(child)?),
                "polygon" => {
                    let mut contours = Vec::new();
                    ctx.walk(child, &ZONE_POLYGON, 0, |ctx, _, pts| {
                        contours.push(ctx.pts(pts)?);
                        Ok(())
                    })?;
                    zone.outline.polygons.extend(polygon_from_contours(contours));
                }
                "filled_polygon" => {
                    let mut layer = String::new();
                    let mut contours = Vec::new();
                    ctx.walk(child, &FILLED_POLYGON, 0, |ctx, kw, c| {
                        match kw {
                            "layer" => layer = single_text(c)?,
                            _ => contours.push(ctx.pts(c)?),
                        }
                        Ok(())
                    })?;
                    let polygon = polygon_from_contours(contours);
                    match zone.fills.iter_mut().find(|f| f.layer == layer) {
                        Some(fill) => fill.polygons.polygons.extend(polygon),
                        None => zone.fills.push(ZoneFill {
                            layer,
                            polygons: PolygonSet::from_polygons(polygon.into_iter().collect()),
                        }),
                    }
                }
                _ => {}
            }
            Ok(())
        })?;
        if zone.layers.is_empty() {
            return Err(syntax(node, "missing required field 'layer' in 'zone'"));
        }
        Ok(zone)
    }
}

fn item_version(_: &mut ParseContext<'_>, node: &Node, board: &mut Board) -> Result<(), ParseError> {
    board.version = single_integer(node)?;
    Ok(())
}

fn item_generator(_: &mut ParseContext<'_>, node: &Node, board: &mut Board) -> Result<(), ParseError> {
    board.generator = Some(single_text(node)?);
    Ok(())
}

fn item_generator_version(_: &mut ParseContext<'_>, node: &Node, board: &mut Board) -> Result<(), ParseError> {
    board.generator_version = Some(single_text(node)?);
    Ok(())
}

fn item_general(ctx: &mut ParseContext<'_>, node: &Node, board: &mut Board) -> Result<(), ParseError> {
    ctx.walk(node, &GENERAL, 0, |ctx, _, child| {
        board.thickness = Some(ctx.single_length(child)?);
        Ok(())
    })
}

fn item_paper(_: &mut ParseContext<'_>, node: &Node, board: &mut Board) -> Result<(), ParseError> {
    board.paper = Some(text(node.args().first().ok_or_else(|| syntax(node, "'paper' expects a size"))?)?);
    Ok(())
}

fn item_title_block(ctx: &mut ParseContext<'_>, node: &Node, board: &mut Board) -> Result<(), ParseError> {
    let mut tb = TitleBlock::default();
    ctx.walk(node, &TITLE_BLOCK, 0, |_, kw, child| {
        match kw {
            "title" => tb.title = Some(single_text(child)?),
            "date" => tb.date = Some(single_text(child)?),
            "rev" => tb.rev = Some(single_text(child)?),
            "company" => tb.company = Some(single_text(child)?),
            _ => {
                let args = exact_args(child, 2)?;
                let index = integer(&args[0])?;
                let index = u8::try_from(index)
                    .ok()
                    .filter(|i| (1..=9).contains(i))
                    .ok_or_else(|| syntax(&args[0], format!("comment number {} out of range 1..9", index)))?;
                tb.comments.insert(index, text(&args[1])?);
            }
        }
        Ok(())
    })?;
    board.title_block = Some(tb);
    Ok(())
}

fn item_layers(_: &mut ParseContext<'_>, node: &Node, board: &mut Board) -> Result<(), ParseError> {
    for entry in node.args() {
        let items = entry.items();
        if items.len() < 3 || items.len() > 4 {
            return Err(syntax(entry, "layer entry expects (ordinal name type [user_name])"));
        }
        board.layers.push(Layer {
            ordinal: integer(&items[0])?,
            canonical_name: text(&items[1])?,
            layer_type: text(&items[2])?,
            user_name: items.get(3).map(text).transpose()?,
        });
    }
    Ok(())
}

fn item_net(ctx: &mut ParseContext<'_>, node: &Node, board: &mut Board) -> Result<(), ParseError> {
    let net = ctx.net(node)?;
    board.nets.push(net);
    Ok(())
}

fn item_footprint(ctx: &mut ParseContext<'_>, node: &Node, board: &mut Board) -> Result<(), ParseError> {
    let fp = ctx.footprint(node)?;
    board.footprints.push(fp);
    Ok(())
}

fn item_drawing(ctx: &mut ParseContext<'_>, node: &Node, board: &mut Board) -> Result<(), ParseError> {
    let drawing = ctx.drawing(node)?;
    board.drawings.push(drawing);
    Ok(())
}

/// First `pts` of a zone polygon is its outline, any further ones are holes
fn polygon_from_contours(contours: Vec<Outline>) -> Option<Polygon> {
    let mut contours = contours.into_iter();
    let outline = contours.next()?;
    Some(Polygon::with_holes(outline, contours.collect()))
}

fn item_zone(ctx: &mut ParseContext<'_>, node: &Node, board: &mut Board) -> Result<(), ParseError> {
    let zone = ctx.zone(node)?;
    board.zones.push(zone);
    Ok(())
}

/// Build a board from an already parsed tree
pub fn board_from_tree(
    root: &Node,
    options: &ParseOptions,
    reporter: Option<&mut dyn Reporter>,
    mut progress: Option<&mut dyn ProgressReporter>,
) -> Result<Board, ParseError> {
    expect_head(root, "kicad_pcb")?;
    let mut ctx = ParseContext::new(options, reporter);
    let mut board = Board::new(0);
    let mut seen: Vec<&'static str> = Vec::new();

    if let Some(p) = progress.as_deref_mut() {
        p.begin_phase("Loading board");
    }

    let items = root.args();
    for (i, child) in items.iter().enumerate() {
        match child.head() {
            Some(keyword) => match BOARD_ITEMS.iter().find(|(spec, _)| spec.keyword == keyword) {
                Some((spec, parse)) => {
                    seen.push(spec.keyword);
                    parse(&mut ctx, child, &mut board)?;
                }
                None => ctx.skip_unknown("kicad_pcb", keyword, child),
            },
            None => ctx.skip_unknown("kicad_pcb", &inline_text(child), child),
        }
        if let Some(p) = progress.as_deref_mut() {
            p.set_progress((i + 1) as f64 / items.len() as f64);
        }
    }

    if let Some((spec, _)) = BOARD_ITEMS.iter().find(|(s, _)| s.required && !seen.contains(&s.keyword)) {
        return Err(syntax(root, format!("missing required field '{}' in 'kicad_pcb'", spec.keyword)));
    }

    log::debug!(
        "loaded board: {} footprints, {} drawings, {} zones ({} values clamped, {} items skipped)",
        board.footprints.len(),
        board.drawings.len(),
        board.zones.len(),
        ctx.clamped,
        ctx.skipped
    );
    Ok(board)
}

/// Parse a `kicad_pcb` document. Syntax errors abort the whole load.
pub fn parse_board(
    text: &str,
    options: &ParseOptions,
    reporter: Option<&mut dyn Reporter>,
    progress: Option<&mut dyn ProgressReporter>,
) -> Result<Board, ParseError> {
    let _scope = NumericScope::enter();
    let root = sexpr::parse(text)?;
    board_from_tree(&root, options, reporter, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportCollector;

    fn parse(text: &str) -> Result<Board, ParseError> {
        parse_board(text, &ParseOptions::default(), None, None)
    }

    #[test]
    fn test_board_units() {
        assert_eq!(board_units(1.5, 1e9), (1_500_000, false));
        assert_eq!(board_units(-0.000001, 1e9), (-1, false));
        let limit = ParseOptions::default().coordinate_limit();
        assert_eq!(board_units(1e12, limit), (1_518_485_687, true));
        assert_eq!(board_units(-1e12, limit), (-1_518_485_687, true));
    }

    #[test]
    fn test_minimal_board() {
        let board = parse("(kicad_pcb (version 20240108) (generator \"pcbnew\") (general (thickness 1.6)))").unwrap();
        assert_eq!(board.version, 20240108);
        assert_eq!(board.generator.as_deref(), Some("pcbnew"));
        assert_eq!(board.thickness, Some(1_600_000));
    }

    #[test]
    fn test_missing_version() {
        let err = parse("(kicad_pcb\n  (paper \"A4\"))").unwrap_err();
        assert!(err.to_string().contains("missing required field 'version'"), "{}", err);
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn test_wrong_root_keyword() {
        let err = parse("(sym_lib_table (version 7))").unwrap_err();
        assert!(err.to_string().contains("expected 'kicad_pcb'"));
    }

    #[test]
    fn test_unknown_keyword_in_extensible_object_warns() {
        let mut collector = ReportCollector::new();
        let board = parse_board(
            "(kicad_pcb (version 1) (setup (pad_to_mask_clearance 0)) (net 0 \"\"))",
            &ParseOptions::default(),
            Some(&mut collector),
            None,
        )
        .unwrap();
        assert_eq!(board.nets.len(), 1);
        let warnings: Vec<&str> = collector.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'setup'"));
    }

    #[test]
    fn test_unknown_keyword_in_fixed_object_fails() {
        let err = parse(
            "(kicad_pcb (version 1)\n  (gr_line (start 0 0) (end 1 1) (layer \"F.SilkS\")\n    (stroke (width 0.1) (colour red))))",
        )
        .unwrap_err();
        assert_eq!((err.line(), err.column()), (3, 25));
        assert!(err.to_string().contains("unknown keyword 'colour' in 'stroke'"));
    }

    #[test]
    fn test_extra_positional_value_fails() {
        let err = parse("(kicad_pcb (version 1) (net 1 \"GND\" extra))").unwrap_err();
        assert!(err.to_string().contains("unexpected 'extra' in 'net'"), "{}", err);
    }

    #[test]
    fn test_clamped_coordinate_warns() {
        let mut collector = ReportCollector::new();
        let board = parse_board(
            "(kicad_pcb (version 1) (gr_line (start 1e12 0) (end 0 0) (layer \"Edge.Cuts\")))",
            &ParseOptions::default(),
            Some(&mut collector),
            None,
        )
        .unwrap();
        match &board.drawings[0].shape {
            Shape::Line { start, .. } => assert_eq!(start.x, 1_518_485_687),
            other => panic!("unexpected shape {:?}", other),
        }
        assert_eq!(collector.warnings().count(), 1);
    }

    #[test]
    fn test_pts_with_arc() {
        let board = parse(
            "(kicad_pcb (version 1) (gr_poly (pts (xy 0 0) (xy 10 0) (arc (start 10 0) (mid 15 5) (end 10 10)) (xy 0 10)) (layer \"F.Cu\")))",
        )
        .unwrap();
        let Shape::Poly { outline } = &board.drawings[0].shape else {
            panic!("expected poly");
        };
        assert_eq!(outline.len(), 4);
        assert!(outline.vertices[1].arc.is_some());
        assert_eq!(outline.point(2), Point::new(10_000_000, 10_000_000));
    }

    #[test]
    fn test_zone_fill_groups_by_layer() {
        let board = parse(
            "(kicad_pcb (version 1)
               (zone (net 1) (net_name \"GND\") (layers \"F.Cu\" \"B.Cu\") (hatch edge 0.5)
                 (polygon (pts (xy 0 0) (xy 10 0) (xy 10 10)))
                 (filled_polygon (layer \"F.Cu\") (pts (xy 0 0) (xy 1 0) (xy 1 1)))
                 (filled_polygon (layer \"F.Cu\") (pts (xy 5 5) (xy 6 5) (xy 6 6)))
                 (filled_polygon (layer \"B.Cu\") (pts (xy 0 0) (xy 1 0) (xy 1 1)))))",
        )
        .unwrap();
        let zone = &board.zones[0];
        assert_eq!(zone.layers, vec!["F.Cu", "B.Cu"]);
        assert_eq!(zone.outline.outline_count(), 1);
        assert_eq!(zone.fills.len(), 2);
        assert_eq!(zone.fills[0].polygons.outline_count(), 2);
    }

    #[test]
    fn test_repeated_closing_point_is_dropped() {
        let board = parse("(kicad_pcb (version 1) (gr_poly (pts (xy 0 0) (xy 1 0) (xy 1 1) (xy 0 0)) (layer \"F.Cu\")))").unwrap();
        let Shape::Poly { outline } = &board.drawings[0].shape else {
            panic!("expected poly");
        };
        assert_eq!(outline.len(), 3);
        assert_eq!(outline.point(2), Point::new(1_000_000, 1_000_000));
    }

    #[test]
    fn test_extra_pts_become_holes() {
        let board = parse(
            "(kicad_pcb (version 1)
               (zone (net 0) (net_name \"\") (layer \"F.Cu\")
                 (polygon (pts (xy 0 0) (xy 10 0) (xy 10 10) (xy 0 10)) (pts (xy 4 4) (xy 4 6) (xy 6 6) (xy 6 4)))
                 (filled_polygon (layer \"F.Cu\") (pts (xy 1 1) (xy 9 1) (xy 9 9)) (pts (xy 5 3) (xy 5 4) (xy 6 4)))))",
        )
        .unwrap();
        let zone = &board.zones[0];
        assert_eq!(zone.outline.outline_count(), 1);
        assert_eq!(zone.outline.hole_count(), 1);
        assert_eq!(zone.outline.polygons[0].holes[0].point(0), Point::new(4_000_000, 4_000_000));
        assert_eq!(zone.fills[0].polygons.hole_count(), 1);
    }

    #[test]
    fn test_progress_reaches_completion() {
        struct Recorder(Vec<String>, f64);
        impl ProgressReporter for Recorder {
            fn begin_phase(&mut self, phase: &str) {
                self.0.push(phase.to_string());
            }
            fn set_progress(&mut self, fraction: f64) {
                self.1 = fraction;
            }
        }
        let mut rec = Recorder(Vec::new(), 0.0);
        parse_board("(kicad_pcb (version 1) (net 0 \"\"))", &ParseOptions::default(), None, Some(&mut rec)).unwrap();
        assert_eq!(rec.0, vec!["Loading board"]);
        assert_eq!(rec.1, 1.0);
    }
}
