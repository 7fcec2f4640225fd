use std::{fmt, str::FromStr};

use combine::{
    between, many, parser, parser::range::recognize, satisfy, skip_many, skip_many1, token,
    ParseError, Parser, RangeStream, StdParseResult, Stream,
};
use thiserror::Error;

/// A JNI type descriptor failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SignatureError(String);

/// A primitive java type. These are the things that can be represented without
/// an object.
#[allow(missing_docs)]
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Primitive {
    Boolean, // Z
    Byte,    // B
    Char,    // C
    Double,  // D
    Float,   // F
    Int,     // I
    Long,    // J
    Short,   // S
    Void,    // V
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Primitive::Boolean => write!(f, "Z"),
            Primitive::Byte => write!(f, "B"),
            Primitive::Char => write!(f, "C"),
            Primitive::Double => write!(f, "D"),
            Primitive::Float => write!(f, "F"),
            Primitive::Int => write!(f, "I"),
            Primitive::Long => write!(f, "J"),
            Primitive::Short => write!(f, "S"),
            Primitive::Void => write!(f, "V"),
        }
    }
}

/// Any java type that can appear in a descriptor.
///
/// Unlike a bare JNI return type this keeps the class name of object types
/// and the element type of arrays, since static field reads need the full
/// type and error messages are better for it.
#[allow(missing_docs)]
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum JavaType {
    Primitive(Primitive),
    Object(String),
    Array(Box<JavaType>),
}

impl JavaType {
    /// True for `V`.
    pub fn is_void(&self) -> bool {
        matches!(self, JavaType::Primitive(Primitive::Void))
    }

    /// True for object and array types.
    pub fn is_reference(&self) -> bool {
        matches!(self, JavaType::Object(_) | JavaType::Array(_))
    }
}

impl FromStr for JavaType {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_complete(s, parser(parse_type))
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            JavaType::Primitive(ref ty) => ty.fmt(f),
            JavaType::Object(ref name) => write!(f, "L{name};"),
            JavaType::Array(ref elem) => write!(f, "[{elem}"),
        }
    }
}

/// A parsed method descriptor such as `(Ljava/lang/String;I)Z`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MethodDescriptor {
    args: Vec<JavaType>,
    ret: JavaType,
}

impl MethodDescriptor {
    /// Argument types, in declaration order.
    pub fn args(&self) -> &[JavaType] {
        &self.args
    }

    /// Return type.
    pub fn ret(&self) -> &JavaType {
        &self.ret
    }
}

impl FromStr for MethodDescriptor {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_complete(s, parser(parse_method_sig))
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for a in &self.args {
            write!(f, "{a}")?;
        }
        write!(f, ")")?;
        write!(f, "{}", self.ret)?;
        Ok(())
    }
}

/// A parsed field descriptor such as `I` or `[Ljava/lang/String;`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FieldDescriptor {
    ty: JavaType,
}

impl FieldDescriptor {
    /// The field's type.
    pub fn ty(&self) -> &JavaType {
        &self.ty
    }
}

impl FromStr for FieldDescriptor {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_complete(s, parser(parse_non_void_type)).map(|ty| FieldDescriptor { ty })
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.ty.fmt(f)
    }
}

fn parse_complete<'a, T, P>(s: &'a str, mut p: P) -> Result<T, SignatureError>
where
    P: Parser<&'a str, Output = T>,
{
    match p.parse(s) {
        Ok((res, "")) => Ok(res),
        Ok((_, tail)) => Err(SignatureError(format!(
            "Trailing input: '{tail}' while parsing '{s}'"
        ))),
        Err(e) => Err(SignatureError(format!("Failed to parse '{s}': {e}"))),
    }
}

fn parse_primitive<S: Stream<Token = char>>(input: &mut S) -> StdParseResult<Primitive, S>
where
    S::Error: ParseError<char, S::Range, S::Position>,
{
    let void = token('V').map(|_| Primitive::Void);

    parser(parse_non_void_primitive)
        .or(void)
        .parse_stream(input)
        .into()
}

fn parse_non_void_primitive<S: Stream<Token = char>>(input: &mut S) -> StdParseResult<Primitive, S>
where
    S::Error: ParseError<char, S::Range, S::Position>,
{
    let boolean = token('Z').map(|_| Primitive::Boolean);
    let byte = token('B').map(|_| Primitive::Byte);
    let char_type = token('C').map(|_| Primitive::Char);
    let double = token('D').map(|_| Primitive::Double);
    let float = token('F').map(|_| Primitive::Float);
    let int = token('I').map(|_| Primitive::Int);
    let long = token('J').map(|_| Primitive::Long);
    let short = token('S').map(|_| Primitive::Short);

    (boolean
        .or(byte)
        .or(char_type)
        .or(double)
        .or(float)
        .or(int)
        .or(long)
        .or(short))
    .parse_stream(input)
    .into()
}

fn parse_array<'a, S>(input: &mut S) -> StdParseResult<JavaType, S>
where
    S: RangeStream<Token = char, Range = &'a str>,
    S::Error: ParseError<char, S::Range, S::Position>,
{
    (token('['), parser(parse_non_void_type))
        .map(|(_, elem)| JavaType::Array(Box::new(elem)))
        .parse_stream(input)
        .into()
}

fn parse_object<'a, S>(input: &mut S) -> StdParseResult<JavaType, S>
where
    S: RangeStream<Token = char, Range = &'a str>,
    S::Error: ParseError<char, &'a str, S::Position>,
{
    fn is_unqualified(c: char) -> bool {
        // JVMS §4.2.2: '.', ';', '[' and '/' are disallowed in an unqualified name
        !matches!(c, '.' | ';' | '[' | '/')
    }

    // One or more segments separated by '/', never starting or ending with '/'
    let class_body = recognize((
        skip_many1(satisfy(is_unqualified)),
        skip_many(token('/').with(skip_many1(satisfy(is_unqualified)))),
    ));

    (
        token('L'),
        class_body.map(|s: &'a str| s.to_owned()),
        token(';'),
    )
        .map(|(_, name, _)| JavaType::Object(name))
        .parse_stream(input)
        .into()
}

fn parse_type<'a, S>(input: &mut S) -> StdParseResult<JavaType, S>
where
    S: RangeStream<Token = char, Range = &'a str>,
    S::Error: ParseError<char, &'a str, S::Position>,
{
    parser(parse_primitive)
        .map(JavaType::Primitive)
        .or(parser(parse_array))
        .or(parser(parse_object))
        .parse_stream(input)
        .into()
}

fn parse_non_void_type<'a, S>(input: &mut S) -> StdParseResult<JavaType, S>
where
    S: RangeStream<Token = char, Range = &'a str>,
    S::Error: ParseError<char, &'a str, S::Position>,
{
    parser(parse_non_void_primitive)
        .map(JavaType::Primitive)
        .or(parser(parse_array))
        .or(parser(parse_object))
        .parse_stream(input)
        .into()
}

fn parse_args<'a, S>(input: &mut S) -> StdParseResult<Vec<JavaType>, S>
where
    S: RangeStream<Token = char, Range = &'a str>,
    S::Error: ParseError<char, S::Range, S::Position>,
{
    between(token('('), token(')'), many(parser(parse_non_void_type)))
        .parse_stream(input)
        .into()
}

fn parse_method_sig<'a, S>(input: &mut S) -> StdParseResult<MethodDescriptor, S>
where
    S: RangeStream<Token = char, Range = &'a str>,
    S::Error: ParseError<char, S::Range, S::Position>,
{
    (parser(parse_args), parser(parse_type))
        .map(|(args, ret)| MethodDescriptor { args, ret })
        .parse_stream(input)
        .into()
}
