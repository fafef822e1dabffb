use serde::Serialize;
use serde_json::Value;
use std::fmt::{self, Write};

/// Argument payload of a traced call.
///
/// Positional values keep their order; keyword values keep insertion order.
/// The [`Display`](fmt::Display) rendering is what ends up in the
/// `<call arguments>` slot of a log line:
///
/// - without keywords: the positional tuple, `(1, 2)`, `(21,)`, `()`;
/// - with any keyword: `(positional, positional + (keywords,))`, e.g.
///   `((1,), (1, {"x": 2}))`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.positional.push(capture(value));
        self
    }

    /// Set a keyword argument. A repeated name replaces the earlier value.
    pub fn kwarg<T: Serialize + ?Sized>(mut self, name: impl Into<String>, value: &T) -> Self {
        self.push_keyword(name.into(), capture(value));
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keywords(&self) -> &[(String, Value)] {
        &self.keywords
    }

    pub fn has_keywords(&self) -> bool {
        !self.keywords.is_empty()
    }

    fn push_keyword(&mut self, name: String, value: Value) {
        match self.keywords.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.keywords.push((name, value)),
        }
    }
}

fn capture<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| Value::String(format!("<unserializable: {}>", e)))
}

fn write_tuple<'a, W, I>(out: &mut W, items: I) -> fmt::Result
where
    W: Write,
    I: IntoIterator<Item = Item<'a>>,
{
    out.write_char('(')?;
    let mut count = 0;
    for item in items {
        if count > 0 {
            out.write_str(", ")?;
        }
        item.write(out)?;
        count += 1;
    }
    if count == 1 {
        out.write_char(',')?;
    }
    out.write_char(')')
}

enum Item<'a> {
    Value(&'a Value),
    Keywords(&'a [(String, Value)]),
    Tuple(&'a [Value]),
}

impl Item<'_> {
    fn write<W: Write>(&self, out: &mut W) -> fmt::Result {
        match self {
            Item::Value(v) => write!(out, "{}", v),
            Item::Tuple(values) => write_tuple(out, values.iter().map(Item::Value)),
            Item::Keywords(keywords) => {
                out.write_char('{')?;
                for (i, (name, value)) in keywords.iter().enumerate() {
                    if i > 0 {
                        out.write_str(", ")?;
                    }
                    write!(out, "{}: {}", Value::String(name.clone()), value)?;
                }
                out.write_char('}')
            }
        }
    }
}

impl fmt::Display for CallArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.keywords.is_empty() {
            return write_tuple(f, self.positional.iter().map(Item::Value));
        }
        let with_keywords = self
            .positional
            .iter()
            .map(Item::Value)
            .chain(std::iter::once(Item::Keywords(&self.keywords)));
        f.write_str("(")?;
        Item::Tuple(&self.positional).write(f)?;
        f.write_str(", ")?;
        write_tuple(f, with_keywords)?;
        f.write_str(")")
    }
}

/// Conversion of a traced function's input into its logged [`CallArgs`].
///
/// Implemented for `()` and tuples of up to eight [`Serialize`] values, for
/// [`WithKwargs`] and for [`CallArgs`] itself.
pub trait ToCallArgs {
    fn to_call_args(&self) -> CallArgs;
}

impl ToCallArgs for () {
    fn to_call_args(&self) -> CallArgs {
        CallArgs::new()
    }
}

impl ToCallArgs for CallArgs {
    fn to_call_args(&self) -> CallArgs {
        self.clone()
    }
}

macro_rules! tuple_call_args {
    ($($name:ident),+) => {
        impl<$($name: Serialize),+> ToCallArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn to_call_args(&self) -> CallArgs {
                let ($($name,)+) = self;
                CallArgs::new()$(.arg($name))+
            }
        }
    };
}

tuple_call_args!(A);
tuple_call_args!(A, B);
tuple_call_args!(A, B, C);
tuple_call_args!(A, B, C, D);
tuple_call_args!(A, B, C, D, E);
tuple_call_args!(A, B, C, D, E, F);
tuple_call_args!(A, B, C, D, E, F, G);
tuple_call_args!(A, B, C, D, E, F, G, H);

/// Positional arguments plus keyword arguments.
///
/// `kwargs` is anything serializing to a map (a struct, a `HashMap`, a
/// `serde_json::json!({...})` object). A value that serializes to something
/// other than a map is logged under the single keyword `kwargs`; `null` adds
/// no keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct WithKwargs<P, K> {
    pub args: P,
    pub kwargs: K,
}

impl<P, K> WithKwargs<P, K> {
    pub fn new(args: P, kwargs: K) -> Self {
        Self { args, kwargs }
    }
}

impl<P: ToCallArgs, K: Serialize> ToCallArgs for WithKwargs<P, K> {
    fn to_call_args(&self) -> CallArgs {
        let mut call = self.args.to_call_args();
        match capture(&self.kwargs) {
            Value::Object(map) => {
                for (name, value) in map {
                    call.push_keyword(name, value);
                }
            }
            Value::Null => {}
            other => call.push_keyword("kwargs".to_string(), other),
        }
        call
    }
}
