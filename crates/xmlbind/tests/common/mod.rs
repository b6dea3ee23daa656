#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use xmlbind::{
    AttributeSpec, BoxError, ChildSpec, Children, Converter, Fragment, InstanceState,
    NameGenerator, Registry, Resolver, Validator, Value, impl_bindable, validators,
};
use xmlbind_dom::XML_NAMESPACE;

pub const FOO_BAR: &str = "http://foo.bar";
pub const PRODUCT_NS: &str = "urn:product";

fn number(v: Value) -> Result<f64, BoxError> {
    Ok(v.try_into()?)
}

fn string(v: Value) -> Result<String, BoxError> {
    Ok(v.try_into()?)
}

// Required numeric attributes with range validators

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Limits {
    pub state: InstanceState,
    pub attr1: f64,
    pub attr2: f64,
}
impl_bindable!(Limits);

pub fn not_too_small() -> Validator {
    Validator::new(|v| match v.as_number() {
        Some(n) if n < 3.0 => Err(format!("{} is too small", n).into()),
        _ => Ok(()),
    })
}

pub fn not_too_big() -> Validator {
    Validator::new(|v| match v.as_number() {
        Some(n) if n > 6.0 => Err(format!("{} is too big", n).into()),
        _ => Ok(()),
    })
}

// Inheritance

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Shape {
    pub state: InstanceState,
    pub id: String,
    pub color: String,
    pub filled: bool,
}
impl_bindable!(Shape);

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Circle {
    pub shape: Shape,
    pub radius: f64,
}
impl_bindable!(Circle => shape.state);

// Child cardinality

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Envelope {
    pub state: InstanceState,
    pub header: Option<Arc<Header>>,
    pub entries: Vec<Arc<Entry>>,
    pub notes: Vec<Arc<Note>>,
}
impl_bindable!(Envelope);

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Header {
    pub state: InstanceState,
    pub title: String,
}
impl_bindable!(Header);

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Entry {
    pub state: InstanceState,
    pub key: String,
    pub value: Option<String>,
}
impl_bindable!(Entry);

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Note {
    pub state: InstanceState,
    pub text: String,
}
impl_bindable!(Note);

// Namespaces

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Catalog {
    pub state: InstanceState,
    pub products: Vec<Arc<Product>>,
}
impl_bindable!(Catalog);

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Product {
    pub state: InstanceState,
    pub sku: String,
    pub lang: Option<String>,
}
impl_bindable!(Product);

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Tagged {
    pub state: InstanceState,
    pub code: String,
}
impl_bindable!(Tagged);

// Object graphs that may contain themselves

#[derive(Debug, Default)]
pub struct Folder {
    pub state: InstanceState,
    pub name: String,
    pub children: Mutex<Vec<Arc<Folder>>>,
}
impl_bindable!(Folder);

// Raw passthrough

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Snippet {
    pub state: InstanceState,
    pub kind: String,
}
impl_bindable!(Snippet);

// Post-deserialization hook

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Span {
    pub state: InstanceState,
    pub start: f64,
    pub end: f64,
}
impl_bindable!(Span);

// Custom converter

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Meeting {
    pub state: InstanceState,
    pub at: (u8, u8),
}
impl_bindable!(Meeting);

pub fn clock_time() -> Converter {
    Converter::new(
        |raw| {
            let (h, m) = raw.split_once(':').ok_or("expected HH:MM")?;
            Ok(Value::custom((h.parse::<u8>()?, m.parse::<u8>()?)))
        },
        |value| {
            let (h, m) = value.downcast_ref::<(u8, u8)>().ok_or("not a clock time")?;
            Ok(format!("{:02}:{:02}", h, m))
        },
    )
}

// A property that was renamed but never bound

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Ghost {
    pub state: InstanceState,
    pub name: String,
}
impl_bindable!(Ghost);

// Generated attribute names

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Settings {
    pub state: InstanceState,
    pub max_count: f64,
    pub retry_delay: f64,
    pub label: String,
}
impl_bindable!(Settings);

pub fn register_all(registry: &mut Registry) -> Result<(), xmlbind::SchemaError> {
    registry.register(
        Fragment::<Limits>::new()
            .element("limits")
            .attribute(
                "attr1",
                AttributeSpec::number()
                    .required()
                    .validator(not_too_small())
                    .validator(not_too_big()),
                |l| Some(l.attr1.into()),
                |l, v| {
                    l.attr1 = number(v)?;
                    Ok(())
                },
            )
            .attribute(
                "attr2",
                AttributeSpec::number()
                    .required()
                    .validator(not_too_small())
                    .validator(not_too_big()),
                |l| Some(l.attr2.into()),
                |l, v| {
                    l.attr2 = number(v)?;
                    Ok(())
                },
            ),
    )?;

    registry.register(
        Fragment::<Shape>::new()
            .element("shape")
            .attribute(
                "id",
                AttributeSpec::string().required(),
                |s| Some(s.id.clone().into()),
                |s, v| {
                    s.id = string(v)?;
                    Ok(())
                },
            )
            .attribute(
                "color",
                AttributeSpec::string(),
                |s| Some(s.color.clone().into()),
                |s, v| {
                    s.color = string(v)?;
                    Ok(())
                },
            )
            .attribute(
                "filled",
                AttributeSpec::boolean(),
                |s| Some(s.filled.into()),
                |s, v| {
                    s.filled = v.try_into()?;
                    Ok(())
                },
            ),
    )?;

    registry.register(
        Fragment::<Circle>::new()
            .element("circle")
            .extends(|c: &Circle| &c.shape, |c: &mut Circle| &mut c.shape)
            .attribute(
                "radius",
                AttributeSpec::number().required(),
                |c| Some(c.radius.into()),
                |c, v| {
                    c.radius = number(v)?;
                    Ok(())
                },
            )
            .attribute(
                "color",
                AttributeSpec::enumeration(["red", "green", "blue"]).named("hue"),
                |c| Some(c.shape.color.clone().into()),
                |c, v| {
                    c.shape.color = string(v)?;
                    Ok(())
                },
            ),
    )?;

    registry.register(
        Fragment::<Envelope>::new()
            .element("envelope")
            .child(
                "header",
                ChildSpec::one(),
                |e: &Envelope| Children::optional(&e.header),
                |e, c| e.header = c.into_first(),
            )
            .child(
                "entries",
                ChildSpec::many(),
                |e: &Envelope| Children::many(&e.entries),
                |e, c| e.entries = c.into_vec(),
            )
            .child(
                "notes",
                ChildSpec::range(0, 2),
                |e: &Envelope| Children::many(&e.notes),
                |e, c| e.notes = c.into_vec(),
            ),
    )?;

    registry.register(Fragment::<Header>::new().element("header").text(
        "title",
        true,
        |h| Some(h.title.clone()),
        |h, t| h.title = t,
    ))?;

    registry.register(
        Fragment::<Entry>::new()
            .element("entry")
            .attribute(
                "key",
                AttributeSpec::string().required(),
                |e| Some(e.key.clone().into()),
                |e, v| {
                    e.key = string(v)?;
                    Ok(())
                },
            )
            .text("value", false, |e| e.value.clone(), |e, t| e.value = Some(t)),
    )?;

    registry.register(Fragment::<Note>::new().element("note").text(
        "text",
        false,
        |n| Some(n.text.clone()),
        |n, t| n.text = t,
    ))?;

    registry.register(
        Fragment::<Catalog>::new()
            .element("catalog")
            .namespace("myns", FOO_BAR)
            .child(
                "products",
                ChildSpec::many(),
                |c: &Catalog| Children::many(&c.products),
                |c, p| c.products = p.into_vec(),
            ),
    )?;

    registry.register(
        Fragment::<Product>::new()
            .element("product")
            .namespace("myns", PRODUCT_NS)
            .attribute(
                "sku",
                AttributeSpec::string().required(),
                |p| Some(p.sku.clone().into()),
                |p, v| {
                    p.sku = string(v)?;
                    Ok(())
                },
            )
            .attribute(
                "lang",
                AttributeSpec::string().namespace("xml", XML_NAMESPACE),
                |p| p.lang.clone().map(Value::from),
                |p, v| {
                    p.lang = Some(string(v)?);
                    Ok(())
                },
            ),
    )?;

    registry.register(
        Fragment::<Tagged>::new()
            .element("tagged")
            .namespace("myns", FOO_BAR)
            .attribute(
                "code",
                AttributeSpec::string().namespace("myns", FOO_BAR),
                |t| Some(t.code.clone().into()),
                |t, v| {
                    t.code = string(v)?;
                    Ok(())
                },
            ),
    )?;

    registry.register(
        Fragment::<Folder>::new()
            .element("folder")
            .attribute(
                "name",
                AttributeSpec::string(),
                |f| Some(f.name.clone().into()),
                |f, v| {
                    f.name = string(v)?;
                    Ok(())
                },
            )
            .child(
                "children",
                ChildSpec::many(),
                |f: &Folder| Children::many(&f.children.lock()),
                |f, c| *f.children.get_mut() = c.into_vec(),
            ),
    )?;

    registry.register(
        Fragment::<Snippet>::new()
            .element("snippet")
            .raw_output()
            .attribute(
                "kind",
                AttributeSpec::string(),
                |s| Some(s.kind.clone().into()),
                |s, v| {
                    s.kind = string(v)?;
                    Ok(())
                },
            ),
    )?;

    registry.register(
        Fragment::<Span>::new()
            .element("span")
            .attribute(
                "start",
                AttributeSpec::number(),
                |s| Some(s.start.into()),
                |s, v| {
                    s.start = number(v)?;
                    Ok(())
                },
            )
            .attribute(
                "end",
                AttributeSpec::number(),
                |s| Some(s.end.into()),
                |s, v| {
                    s.end = number(v)?;
                    Ok(())
                },
            )
            .after_deserialize(|s| {
                if s.start > s.end {
                    return Err(format!("start {} is after end {}", s.start, s.end).into());
                }
                Ok(())
            }),
    )?;

    registry.register(Fragment::<Meeting>::new().element("meeting").attribute(
        "at",
        AttributeSpec::custom(clock_time()).required(),
        |m| Some(Value::custom(m.at)),
        |m, v| {
            m.at = *v.downcast_ref::<(u8, u8)>().ok_or("expected a clock time")?;
            Ok(())
        },
    ))?;

    registry.register(
        Fragment::<Ghost>::new()
            .element("ghost")
            .rename_attribute("name", "n"),
    )?;

    registry.register(
        Fragment::<Settings>::new()
            .element("settings")
            .attribute_names(NameGenerator::kebab_case())
            .attribute(
                "max_count",
                AttributeSpec::number().validator(validators::min(0.0)),
                |s| Some(s.max_count.into()),
                |s, v| {
                    s.max_count = number(v)?;
                    Ok(())
                },
            )
            .attribute(
                "retry_delay",
                AttributeSpec::number(),
                |s| Some(s.retry_delay.into()),
                |s, v| {
                    s.retry_delay = number(v)?;
                    Ok(())
                },
            )
            .attribute(
                "label",
                AttributeSpec::string().named("title"),
                |s| Some(s.label.clone().into()),
                |s, v| {
                    s.label = string(v)?;
                    Ok(())
                },
            ),
    )?;

    Ok(())
}

pub fn resolver() -> Resolver {
    let mut registry = Registry::new();
    register_all(&mut registry).expect("fixture schemas register");
    Resolver::new(registry)
}
