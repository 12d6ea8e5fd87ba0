use std::fmt;

use eyre::Result;
use glam::{Vec2, Vec3};
use smallvec::SmallVec;

use crate::color::spectrum;

use super::{
    lexer::{Lexeme, LexemeKind},
    source_stack::SourceStack,
    unexpected, ParseError,
};

pub type ValueVec<T> = SmallVec<[T; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Texture,
    Float,
    Integer,
    Bool,
    Point2,
    Point3,
    Normal3,
    Vector3,
    Rgb,
    Spectrum,
    Blackbody,
}

impl ParamType {
    const ALL: [ParamType; 12] = [
        ParamType::String,
        ParamType::Texture,
        ParamType::Float,
        ParamType::Integer,
        ParamType::Bool,
        ParamType::Point2,
        ParamType::Point3,
        ParamType::Normal3,
        ParamType::Vector3,
        ParamType::Rgb,
        ParamType::Spectrum,
        ParamType::Blackbody,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Texture => "texture",
            ParamType::Float => "float",
            ParamType::Integer => "integer",
            ParamType::Bool => "bool",
            ParamType::Point2 => "point2",
            ParamType::Point3 => "point3",
            ParamType::Normal3 => "normal3",
            ParamType::Vector3 => "vector3",
            ParamType::Rgb => "rgb",
            ParamType::Spectrum => "spectrum",
            ParamType::Blackbody => "blackbody",
        }
    }

    /// Looks up a type after synonym normalization.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = canonical_type_name(name);
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Some type names are aliases of a canonical one.
pub fn canonical_type_name(name: &str) -> &str {
    match name {
        "point" => "point3",
        "normal" => "normal3",
        "vector" => "vector3",
        "color" => "rgb",
        n => n,
    }
}

/// The types a known parameter name may be declared with.
///
/// Names missing from the table are passed through without a check.
pub fn admissible_types(param: &str) -> Option<&'static [ParamType]> {
    use ParamType::*;

    let types: &'static [ParamType] = match param {
        // camera
        "frameaspectratio" | "lensradius" | "focaldistance" | "fov" => &[Float],
        // film
        "xresolution" | "yresolution" => &[Integer],
        // curves
        "p" => &[Point3],
        "type" => &[String],
        "N" => &[Normal3],
        "splitdepth" => &[Integer],
        "width" => &[Float],
        // shapes
        "indices" => &[Integer],
        "P" => &[Point3],
        "uv" | "st" => &[Float, Point2],
        "radius" => &[Float],
        // lights
        "scale" => &[Spectrum, Rgb, Float],
        "L" | "I" => &[Spectrum, Rgb, Blackbody],
        "mapname" => &[String],
        "from" | "to" => &[Point3],
        "twosided" => &[Bool],
        // materials
        "Kd" | "Ks" | "Kr" | "Kt" | "reflect" | "transmit" | "k" => &[Spectrum, Rgb, Texture],
        "eta" => &[Float, Spectrum, Rgb, Texture],
        "roughness" => &[Float, Texture],
        "index" => &[Float],
        "amount" => &[Float, Rgb],
        "namedmaterial1" | "namedmaterial2" => &[String],
        "bumpmap" | "bump" => &[Texture],
        // textures
        "filename" => &[String],
        "value" => &[Float, Spectrum, Rgb],
        "uscale" | "vscale" => &[Float],
        "tex1" | "tex2" => &[Texture, Float, Spectrum, Rgb],
        _ => return None,
    };

    Some(types)
}

/// Fails if `param` is known and `typ` (already normalized) isn't one of its admissible types.
pub fn check_param_type(param: &str, typ: &str) -> Result<()> {
    let Some(types) = admissible_types(param) else {
        return Ok(());
    };

    if types.iter().any(|t| t.name() == typ) {
        return Ok(());
    }

    let expected = types
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join("/");

    Err(ParseError::ParamTypeMismatch {
        name: param.to_string(),
        expected,
        got: typ.to_string(),
    }
    .into())
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Strings(ValueVec<String>),
    Floats(ValueVec<f32>),
    Ints(ValueVec<i32>),
    Vec3s(ValueVec<Vec3>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub typ: ParamType,
    pub value: ParamValue,
}

impl Param {
    pub fn strings(&self) -> Result<&[String]> {
        match &self.value {
            ParamValue::Strings(s) => Ok(s),
            v => Err(self.bad_value(format!("expected strings, got '{v:?}'"))),
        }
    }

    pub fn floats(&self) -> Result<&[f32]> {
        match &self.value {
            ParamValue::Floats(f) => Ok(f),
            v => Err(self.bad_value(format!("expected floats, got '{v:?}'"))),
        }
    }

    pub fn ints(&self) -> Result<&[i32]> {
        match &self.value {
            ParamValue::Ints(i) => Ok(i),
            v => Err(self.bad_value(format!("expected integers, got '{v:?}'"))),
        }
    }

    pub fn vec3s(&self) -> Result<&[Vec3]> {
        match &self.value {
            ParamValue::Vec3s(v) => Ok(v),
            v => Err(self.bad_value(format!("expected 3-vectors, got '{v:?}'"))),
        }
    }

    pub fn first_string(&self) -> Result<&str> {
        self.strings()?
            .first()
            .map(String::as_str)
            .ok_or_else(|| self.bad_value("no value".to_string()))
    }

    pub fn first_float(&self) -> Result<f32> {
        self.floats()?
            .first()
            .copied()
            .ok_or_else(|| self.bad_value("no value".to_string()))
    }

    pub fn first_int(&self) -> Result<i32> {
        self.ints()?
            .first()
            .copied()
            .ok_or_else(|| self.bad_value("no value".to_string()))
    }

    pub fn first_vec3(&self) -> Result<Vec3> {
        self.vec3s()?
            .first()
            .copied()
            .ok_or_else(|| self.bad_value("no value".to_string()))
    }

    pub fn first_bool(&self) -> Result<bool> {
        Ok(self.first_string()? == "true")
    }

    /// A float or an rgb value, floats are splatted to all channels.
    pub fn first_color(&self) -> Result<Vec3> {
        match &self.value {
            ParamValue::Floats(_) => Ok(Vec3::splat(self.first_float()?)),
            _ => self.first_vec3(),
        }
    }

    pub fn uvs(&self) -> Result<Vec<Vec2>> {
        let floats = self.floats()?;
        if floats.len() % 2 != 0 {
            return Err(self.bad_value(format!(
                "expected an even number of values, got {}",
                floats.len()
            )));
        }

        Ok(floats.chunks_exact(2).map(|c| Vec2::new(c[0], c[1])).collect())
    }

    fn bad_value(&self, reason: String) -> eyre::Report {
        ParseError::BadParamValue {
            name: self.name.clone(),
            reason,
        }
        .into()
    }
}

#[derive(Debug, Default)]
pub struct ParamList {
    params: SmallVec<[Param; 4]>,
}

impl ParamList {
    pub fn new(params: SmallVec<[Param; 4]>) -> Self {
        Self { params }
    }

    /// First parameter with the given name.
    pub fn get(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Parses parameters until the identifier of the next directive (or the end of input).
pub fn parse_param_list(src: &mut SourceStack) -> Result<ParamList> {
    let mut params = SmallVec::new();

    while !matches!(src.peek()?, Lexeme::Ident(_) | Lexeme::Eof) {
        params.push(parse_param(src)?);
    }

    Ok(ParamList::new(params))
}

pub fn parse_param(src: &mut SourceStack) -> Result<Param> {
    let header = match src.next()? {
        Lexeme::Str(s) => s,
        l => return Err(unexpected("a \"<type> <name>\" parameter declaration", l)),
    };

    let mut words = header.split_whitespace();
    let (typ, name) = match (words.next(), words.next(), words.next()) {
        (Some(typ), Some(name), None) => (canonical_type_name(typ), name.to_string()),
        _ => return Err(ParseError::MalformedParamHeader(header.clone()).into()),
    };

    check_param_type(&name, typ)?;

    let typ = ParamType::from_name(typ)
        .ok_or_else(|| ParseError::UnsupportedParamType(typ.to_string()))?;

    let (typ, value) = match typ {
        ParamType::String | ParamType::Texture => {
            let values = parse_run(src, LexemeKind::Str, &name, Some(1))?;
            let strings = values.into_iter().filter_map(into_string).collect();
            (typ, ParamValue::Strings(strings))
        }
        ParamType::Bool => {
            let values = parse_run(src, LexemeKind::Str, &name, Some(1))?;
            let mut strings = ValueVec::new();
            for v in values.into_iter().filter_map(into_string) {
                if v != "true" && v != "false" {
                    return Err(ParseError::BadParamValue {
                        name,
                        reason: format!("bool values must be \"true\" or \"false\", got \"{v}\""),
                    }
                    .into());
                }
                strings.push(v);
            }
            (typ, ParamValue::Strings(strings))
        }
        ParamType::Float => (typ, ParamValue::Floats(parse_floats(src, &name)?)),
        ParamType::Integer => {
            let values = parse_run(src, LexemeKind::Num, &name, None)?;
            let ints = values
                .iter()
                .map(|l| parse_int(l, &name))
                .collect::<Result<_>>()?;
            (typ, ParamValue::Ints(ints))
        }
        ParamType::Point2 => {
            let floats = parse_floats(src, &name)?;
            if floats.len() % 2 != 0 {
                return Err(wrong_count(&name, floats.len(), 2));
            }
            (typ, ParamValue::Floats(floats))
        }
        ParamType::Point3 | ParamType::Normal3 | ParamType::Vector3 | ParamType::Rgb => {
            let floats = parse_floats(src, &name)?;
            (typ, ParamValue::Vec3s(group_vec3s(&floats, &name)?))
        }
        ParamType::Spectrum => {
            let rgb = parse_spectrum(src, &name)?;
            (ParamType::Rgb, ParamValue::Vec3s(smallvec::smallvec![rgb]))
        }
        ParamType::Blackbody => {
            let floats = parse_floats(src, &name)?;
            if floats.len() != 2 {
                return Err(ParseError::BadParamValue {
                    name,
                    reason: format!(
                        "blackbody expects a temperature and a scale, got {} values",
                        floats.len()
                    ),
                }
                .into());
            }
            let rgb = spectrum::blackbody_to_rgb(floats[0], floats[1]);
            (ParamType::Rgb, ParamValue::Vec3s(smallvec::smallvec![rgb]))
        }
    };

    Ok(Param { name, typ, value })
}

fn parse_spectrum(src: &mut SourceStack, name: &str) -> Result<Vec3> {
    let bracketed = src.peek()? == &Lexeme::OpenBracket;
    if bracketed {
        src.next()?;
    }

    let first = src.next()?;
    let samples = match &first {
        Lexeme::Str(filename) => {
            let path = src.current_directory().join(filename);
            if bracketed {
                expect_close_bracket(src)?;
            }
            spectrum::load_spectrum_file(&path)?
        }
        Lexeme::Num(_) => {
            let mut floats: ValueVec<f32> = smallvec::smallvec![parse_float(&first, name)?];
            while let Lexeme::Num(_) = src.peek()? {
                floats.push(parse_float(&src.next()?, name)?);
            }
            if bracketed {
                expect_close_bracket(src)?;
            }
            if floats.len() % 2 != 0 {
                return Err(wrong_count(name, floats.len(), 2));
            }

            floats
                .chunks_exact(2)
                .map(|c| Vec2::new(c[0], c[1]))
                .collect()
        }
        _ => return Err(no_values(name)),
    };

    Ok(spectrum::spectrum_to_rgb(&samples))
}

fn parse_floats(src: &mut SourceStack, name: &str) -> Result<ValueVec<f32>> {
    parse_run(src, LexemeKind::Num, name, None)?
        .iter()
        .map(|l| parse_float(l, name))
        .collect()
}

/// Parses a run of numbers, bracketed or not, as used by the matrix directives.
pub fn parse_number_run(src: &mut SourceStack, what: &str) -> Result<Vec<f32>> {
    parse_run(src, LexemeKind::Num, what, None)?
        .iter()
        .map(|l| parse_float(l, what))
        .collect()
}

/// Reads either a bracketed list or a bare run of lexemes of one kind.
///
/// A bare run stops at the first lexeme of another kind, or after `bare_limit` values.
fn parse_run(
    src: &mut SourceStack,
    kind: LexemeKind,
    name: &str,
    bare_limit: Option<usize>,
) -> Result<Vec<Lexeme>> {
    let bracketed = src.peek()? == &Lexeme::OpenBracket;
    if bracketed {
        src.next()?;
    }

    let mut values = Vec::new();
    loop {
        if !bracketed && bare_limit.is_some_and(|limit| values.len() >= limit) {
            break;
        }
        if src.peek()?.kind() != kind {
            break;
        }
        values.push(src.next()?);
    }

    if bracketed {
        match src.next()? {
            Lexeme::CloseBracket => (),
            Lexeme::Eof => return Err(ParseError::UnexpectedEof.into()),
            l => {
                return Err(ParseError::BadParamValue {
                    name: name.to_string(),
                    reason: format!("expected {} or ']', got '{}'", kind.describe(), l),
                }
                .into())
            }
        }
    }

    if values.is_empty() {
        return Err(no_values(name));
    }

    Ok(values)
}

fn expect_close_bracket(src: &mut SourceStack) -> Result<()> {
    match src.next()? {
        Lexeme::CloseBracket => Ok(()),
        l => Err(unexpected("']'", l)),
    }
}

fn group_vec3s(floats: &[f32], name: &str) -> Result<ValueVec<Vec3>> {
    if floats.len() % 3 != 0 {
        return Err(wrong_count(name, floats.len(), 3));
    }

    Ok(floats.chunks_exact(3).map(Vec3::from_slice).collect())
}

fn into_string(l: Lexeme) -> Option<String> {
    match l {
        Lexeme::Str(s) => Some(s),
        _ => None,
    }
}

pub fn parse_float(l: &Lexeme, name: &str) -> Result<f32> {
    match l {
        Lexeme::Num(n) => n.parse::<f32>().map_err(|_| {
            ParseError::BadParamValue {
                name: name.to_string(),
                reason: format!("'{n}' is not a valid float"),
            }
            .into()
        }),
        l => Err(unexpected("a number", l.clone())),
    }
}

fn parse_int(l: &Lexeme, name: &str) -> Result<i32> {
    match l {
        Lexeme::Num(n) => n.parse::<i32>().map_err(|_| {
            ParseError::BadParamValue {
                name: name.to_string(),
                reason: format!("'{n}' is not a valid integer"),
            }
            .into()
        }),
        l => Err(unexpected("a number", l.clone())),
    }
}

fn no_values(name: &str) -> eyre::Report {
    ParseError::BadParamValue {
        name: name.to_string(),
        reason: "no value supplied".to_string(),
    }
    .into()
}

fn wrong_count(name: &str, count: usize, multiple: usize) -> eyre::Report {
    ParseError::BadParamValue {
        name: name.to_string(),
        reason: format!("wrong number of values: {count} is not a multiple of {multiple}"),
    }
    .into()
}

#[cfg(test)]
mod test_super {
    use std::path::PathBuf;

    use glam::vec3;

    use super::*;

    fn parse(txt: &str) -> Result<ParamList> {
        let mut src = SourceStack::from_text(txt, PathBuf::new(), 4);
        parse_param_list(&mut src)
    }

    fn parse_err(txt: &str) -> ParseError {
        let err = parse(txt).unwrap_err();
        match err.root_cause().downcast_ref::<ParseError>() {
            Some(e) => e.clone(),
            None => panic!("Unexpected error: {err}"),
        }
    }

    #[test]
    fn test_scalars_and_lists() {
        let params = parse(
            "\"float fov\" 45 \"integer indices\" [0 1 2] \"string filename\" \"a.png\" \
             \"bool twosided\" \"true\" Shape",
        )
        .unwrap();

        assert_eq!(params.get("fov").unwrap().first_float().unwrap(), 45.);
        assert_eq!(params.get("indices").unwrap().ints().unwrap(), &[0, 1, 2]);
        assert_eq!(
            params.get("filename").unwrap().first_string().unwrap(),
            "a.png"
        );
        assert!(params.get("twosided").unwrap().first_bool().unwrap());
    }

    #[test]
    fn test_vec3_grouping_and_synonyms() {
        let params = parse("\"point P\" [0 0 0 1 0 0] \"color Kd\" [.5 .25 1]").unwrap();

        let p = params.get("P").unwrap();
        assert_eq!(p.typ, ParamType::Point3);
        assert_eq!(p.vec3s().unwrap(), &[Vec3::ZERO, vec3(1., 0., 0.)]);

        let kd = params.get("Kd").unwrap();
        assert_eq!(kd.typ, ParamType::Rgb);
        assert_eq!(kd.first_vec3().unwrap(), vec3(0.5, 0.25, 1.));
    }

    #[test]
    fn test_bare_number_run() {
        let params = parse("\"rgb L\" 1 2 3 \"float scale\" 2").unwrap();
        assert_eq!(
            params.get("L").unwrap().first_vec3().unwrap(),
            vec3(1., 2., 3.)
        );
        assert_eq!(params.get("scale").unwrap().first_float().unwrap(), 2.);
    }

    #[test]
    fn test_unknown_names_are_not_checked() {
        let params = parse("\"integer maxdepth\" [5]").unwrap();
        assert_eq!(params.get("maxdepth").unwrap().first_int().unwrap(), 5);
    }

    #[test]
    fn test_type_mismatch() {
        assert!(matches!(
            parse_err("\"integer Kd\" [1]"),
            ParseError::ParamTypeMismatch { .. }
        ));
        assert!(matches!(
            parse_err("\"float Kd\" [1]"),
            ParseError::ParamTypeMismatch { .. }
        ));
    }

    #[test]
    fn test_mismatch_names_admissible_types() {
        let err = parse_err("\"float Kd\" [1]");
        let msg = err.to_string();
        assert!(msg.contains("Kd"));
        assert!(msg.contains("spectrum/rgb/texture"));
    }

    #[test]
    fn test_unsupported_type() {
        assert!(matches!(
            parse_err("\"matrix m\" [1]"),
            ParseError::UnsupportedParamType(_)
        ));
    }

    #[test]
    fn test_wrong_counts() {
        assert!(matches!(
            parse_err("\"point3 P\" [0 0 0 1]"),
            ParseError::BadParamValue { .. }
        ));
        assert!(matches!(
            parse_err("\"spectrum Kd\" [400 0.5 500]"),
            ParseError::BadParamValue { .. }
        ));
        assert!(matches!(
            parse_err("\"blackbody L\" [6500]"),
            ParseError::BadParamValue { .. }
        ));
    }

    #[test]
    fn test_bad_bool() {
        assert!(matches!(
            parse_err("\"bool twosided\" \"yes\""),
            ParseError::BadParamValue { .. }
        ));
    }

    #[test]
    fn test_spectrum_is_rewritten_to_rgb() {
        let params =
            parse("\"spectrum Kd\" [300 .5 400 .5 500 .5 600 .5 700 .5 800 .5]").unwrap();
        let kd = params.get("Kd").unwrap();
        assert_eq!(kd.typ, ParamType::Rgb);
        let rgb = kd.first_vec3().unwrap();
        assert!(rgb.min_element() > 0.);

        let params = parse("\"blackbody L\" [6500 1]").unwrap();
        assert_eq!(params.get("L").unwrap().typ, ParamType::Rgb);
    }

    #[test]
    fn test_malformed_header() {
        assert!(matches!(
            parse_err("\"float\" 1"),
            ParseError::MalformedParamHeader(_)
        ));
    }
}
