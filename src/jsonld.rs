//! JSON-LD expansion, node map generation and conversion to RDF.
//!
//! <https://www.w3.org/TR/json-ld11-api/#rdf-serialization-deserialization-algorithms>

use std::collections::{BTreeMap, HashMap};
use std::convert::TryFrom;
use std::str::FromStr;

use futures::executor::block_on;
use iref::Iri;
use json_ld::expansion::{Action, Policy};
use json_ld::syntax::IntoJsonWithContext;
use json_ld::{JsonLdProcessor, Options};
use serde_json::{Map, Value};

use crate::error::{Error, JsonLdError};
use crate::loader::{ContextResolver, RemoteDocument, ResolverLoader};
use crate::rdf::{
    BlankNodeLabel, DataSet, GraphLabel, IRIOrBlankNodeIdentifier, IRIRef, Lang, Literal, Object,
    Predicate, Statement, StringLiteral, Subject, LANG_STRING_IRI_STR, RDF_FIRST, RDF_JSON,
    RDF_NIL, RDF_REST, RDF_TYPE, XSD_BOOLEAN, XSD_DOUBLE, XSD_INTEGER, XSD_STRING,
};

pub const AT_DEFAULT: &str = "@default";
pub const AT_GRAPH: &str = "@graph";
pub const AT_ID: &str = "@id";
pub const AT_INCLUDED: &str = "@included";
pub const AT_INDEX: &str = "@index";
pub const AT_JSON: &str = "@json";
pub const AT_LANGUAGE: &str = "@language";
pub const AT_LIST: &str = "@list";
pub const AT_REVERSE: &str = "@reverse";
pub const AT_TYPE: &str = "@type";
pub const AT_VALUE: &str = "@value";

pub fn is_blank_node_identifier(string: &str) -> bool {
    string.starts_with("_:")
}

/// The entries of a value, treating a non-array as a single entry.
pub fn values_of(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        value => std::slice::from_ref(value),
    }
}

/// Graph name → subject → node object.
pub type NodeMap = BTreeMap<String, Map<String, Value>>;

#[derive(Debug, Clone, Default)]
pub struct BlankNodeIdentifierGenerator {
    identifier_map: HashMap<String, String>,
    counter: u64,
}

impl BlankNodeIdentifierGenerator {
    /// <https://www.w3.org/TR/json-ld11-api/#generate-blank-node-identifier>
    pub fn generate(&mut self, identifier: Option<&str>) -> String {
        // 1
        if let Some(id) = identifier.and_then(|identifier| self.identifier_map.get(identifier)) {
            return id.clone();
        }
        // 2
        let id = format!("_:b{}", self.counter);
        self.counter += 1;
        // 3
        if let Some(identifier) = identifier {
            self.identifier_map
                .insert(identifier.to_string(), id.clone());
        }
        id
    }
}

fn reference(id: &str) -> Value {
    let mut object = Map::new();
    object.insert(AT_ID.to_string(), Value::String(id.to_string()));
    Value::Object(object)
}

fn node_mut<'a>(
    node_map: &'a mut NodeMap,
    graph: &str,
    subject: &str,
) -> Result<&'a mut Map<String, Value>, Error> {
    match node_map
        .get_mut(graph)
        .ok_or(Error::MissingGraph)?
        .get_mut(subject)
    {
        Some(Value::Object(node)) => Ok(node),
        _ => Err(Error::ExpectedObject),
    }
}

fn subject_node_mut<'a>(
    node_map: &'a mut NodeMap,
    graph: &str,
    active_subject: Option<&Value>,
) -> Result<&'a mut Map<String, Value>, Error> {
    let subject = active_subject
        .and_then(Value::as_str)
        .ok_or(Error::ExpectedString)?;
    node_mut(node_map, graph, subject)
}

/// Add a value to the array entry `property` of a node, unless already present.
fn add_unique(node: &mut Map<String, Value>, property: &str, value: Value) -> Result<(), Error> {
    match node
        .entry(property)
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(items) => {
            if !items.contains(&value) {
                items.push(value);
            }
            Ok(())
        }
        _ => Err(Error::ExpectedArray),
    }
}

fn relabel(value: &mut Value, generator: &mut BlankNodeIdentifierGenerator) {
    if let Value::String(id) = value {
        if is_blank_node_identifier(id) {
            *id = generator.generate(Some(id.as_str()));
        }
    }
}

/// <https://www.w3.org/TR/json-ld11-api/#node-map-generation>
#[allow(clippy::too_many_arguments)]
pub fn generate_node_map(
    element: Value,
    node_map: &mut NodeMap,
    active_graph: &str,
    active_subject: Option<&Value>,
    active_property: Option<&str>,
    mut list: Option<&mut Vec<Value>>,
    generator: &mut BlankNodeIdentifierGenerator,
) -> Result<(), Error> {
    let mut element = match element {
        // 1
        Value::Array(items) => {
            for item in items {
                generate_node_map(
                    item,
                    node_map,
                    active_graph,
                    active_subject,
                    active_property,
                    list.as_deref_mut(),
                    generator,
                )?;
            }
            return Ok(());
        }
        Value::Object(object) => object,
        _ => return Err(Error::ExpectedObject),
    };
    // 2
    node_map.entry(active_graph.to_string()).or_default();
    // 3
    match element.get_mut(AT_TYPE) {
        Some(Value::Array(types)) => {
            for type_ in types {
                relabel(type_, generator);
            }
        }
        Some(type_) => relabel(type_, generator),
        None => {}
    }
    if element.contains_key(AT_VALUE) {
        // 4
        let element = Value::Object(element);
        match list {
            Some(list) => list.push(element),
            None => {
                let property = active_property.ok_or(Error::MissingActiveProperty)?;
                let node = subject_node_mut(node_map, active_graph, active_subject)?;
                add_unique(node, property, element)?;
            }
        }
    } else if let Some(items) = element.remove(AT_LIST) {
        // 5
        let mut result = Vec::new();
        generate_node_map(
            items,
            node_map,
            active_graph,
            active_subject,
            active_property,
            Some(&mut result),
            generator,
        )?;
        let mut list_object = Map::new();
        list_object.insert(AT_LIST.to_string(), Value::Array(result));
        let list_object = Value::Object(list_object);
        match list {
            Some(list) => list.push(list_object),
            None => {
                let property = active_property.ok_or(Error::MissingActiveProperty)?;
                let node = subject_node_mut(node_map, active_graph, active_subject)?;
                match node
                    .entry(property)
                    .or_insert_with(|| Value::Array(Vec::new()))
                {
                    Value::Array(items) => items.push(list_object),
                    _ => return Err(Error::ExpectedArray),
                }
            }
        }
    } else {
        // 6.1, 6.2
        let id = match element.remove(AT_ID) {
            Some(Value::String(id)) if is_blank_node_identifier(&id) => {
                generator.generate(Some(&id))
            }
            Some(Value::String(id)) => id,
            Some(Value::Null) | None => generator.generate(None),
            Some(_) => return Err(Error::ExpectedString),
        };
        // 6.3
        node_map
            .entry(active_graph.to_string())
            .or_default()
            .entry(id.clone())
            .or_insert_with(|| reference(&id));
        match active_subject {
            // 6.5
            Some(referencing) if referencing.is_object() => {
                let property = active_property.ok_or(Error::MissingActiveProperty)?;
                add_unique(
                    node_mut(node_map, active_graph, &id)?,
                    property,
                    referencing.clone(),
                )?;
            }
            // 6.6
            _ => {
                if let Some(property) = active_property {
                    match list {
                        Some(list) => list.push(reference(&id)),
                        None => {
                            let node = subject_node_mut(node_map, active_graph, active_subject)?;
                            add_unique(node, property, reference(&id))?;
                        }
                    }
                }
            }
        }
        // 6.7
        if let Some(types) = element.remove(AT_TYPE) {
            let node = node_mut(node_map, active_graph, &id)?;
            for type_ in values_of(&types) {
                add_unique(node, AT_TYPE, type_.clone())?;
            }
        }
        // 6.8
        if let Some(index) = element.remove(AT_INDEX) {
            let node = node_mut(node_map, active_graph, &id)?;
            match node.get(AT_INDEX) {
                Some(existing) if existing != &index => return Err(Error::ConflictingIndexes),
                Some(_) => {}
                None => {
                    node.insert(AT_INDEX.to_string(), index);
                }
            }
        }
        // 6.9
        if let Some(reverse_map) = element.remove(AT_REVERSE) {
            let referenced_node = reference(&id);
            let reverse_map = match reverse_map {
                Value::Object(reverse_map) => reverse_map,
                _ => return Err(Error::ExpectedObject),
            };
            for (property, values) in reverse_map {
                generate_node_map(
                    values,
                    node_map,
                    active_graph,
                    Some(&referenced_node),
                    Some(&property),
                    None,
                    generator,
                )?;
            }
        }
        // 6.10
        if let Some(graph) = element.remove(AT_GRAPH) {
            generate_node_map(graph, node_map, &id, None, None, None, generator)?;
        }
        // 6.11
        if let Some(included) = element.remove(AT_INCLUDED) {
            generate_node_map(included, node_map, active_graph, None, None, None, generator)?;
        }
        // 6.12
        let subject = Value::String(id.clone());
        for (property, value) in element {
            let property = if is_blank_node_identifier(&property) {
                generator.generate(Some(&property))
            } else {
                property
            };
            node_mut(node_map, active_graph, &id)?
                .entry(property.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            generate_node_map(
                value,
                node_map,
                active_graph,
                Some(&subject),
                Some(&property),
                None,
                generator,
            )?;
        }
    }
    Ok(())
}

/// <https://www.w3.org/TR/json-ld11-api/#deserialize-json-ld-to-rdf-algorithm>
pub fn json_ld_to_rdf(
    node_map: &NodeMap,
    dataset: &mut DataSet,
    generator: &mut BlankNodeIdentifierGenerator,
) -> Result<(), Error> {
    // 1
    for (graph_name, graph) in node_map {
        // 1.1
        let graph_label = if graph_name == AT_DEFAULT {
            None
        } else {
            match GraphLabel::try_from(graph_name.clone()) {
                Ok(label) => Some(label),
                Err(_) => continue,
            }
        };
        // 1.3
        for (subject, node) in graph {
            // 1.3.1
            let subject = match Subject::try_from(subject.clone()) {
                Ok(subject) => subject,
                Err(_) => continue,
            };
            let node = node.as_object().ok_or(Error::ExpectedObject)?;
            // 1.3.2
            for (property, values) in node {
                if property == AT_TYPE {
                    // 1.3.2.1
                    for type_ in values_of(values) {
                        let object = match type_.as_str().map(|t| Object::try_from(t.to_string())) {
                            Some(Ok(object)) => object,
                            _ => continue,
                        };
                        dataset.add_statement(Statement {
                            subject: subject.clone(),
                            predicate: Predicate::iri(RDF_TYPE),
                            object,
                            graph_label: graph_label.clone(),
                        });
                    }
                } else if property.starts_with('@') {
                    // 1.3.2.2: expanded node keys starting with `@` are keywords
                    continue;
                } else if is_blank_node_identifier(property) {
                    // 1.3.2.3
                    warn!("skipping blank node predicate: {}", property);
                    continue;
                } else {
                    // 1.3.2.4
                    let predicate = match IRIRef::try_from(property.clone()) {
                        Ok(iri) => Predicate::IRIRef(iri),
                        Err(_) => continue,
                    };
                    // 1.3.2.5
                    for item in values_of(values) {
                        let mut list_triples = Vec::new();
                        if let Some(object) = object_to_rdf(item, &mut list_triples, generator)? {
                            dataset.add_statement(Statement {
                                subject: subject.clone(),
                                predicate: predicate.clone(),
                                object,
                                graph_label: graph_label.clone(),
                            });
                        }
                        for mut triple in list_triples {
                            triple.graph_label = graph_label.clone();
                            dataset.add_statement(triple);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

/// <https://www.w3.org/TR/xmlschema11-2/#f-doubleCanmap>
fn canonical_double(number: f64) -> String {
    let formatted = format!("{:.15E}", number);
    match formatted.split_once('E') {
        Some((mantissa, exponent)) => {
            let mantissa = mantissa.trim_end_matches('0');
            if mantissa.ends_with('.') {
                format!("{}0E{}", mantissa, exponent)
            } else {
                format!("{}E{}", mantissa, exponent)
            }
        }
        None => formatted,
    }
}

/// <https://www.w3.org/TR/json-ld11-api/#object-to-rdf-conversion>
///
/// List triples are returned without a graph label.
pub fn object_to_rdf(
    item: &Value,
    list_triples: &mut Vec<Statement>,
    generator: &mut BlankNodeIdentifierGenerator,
) -> Result<Option<Object>, Error> {
    let item = item.as_object().ok_or(Error::ExpectedObject)?;
    // 3
    if let Some(list) = item.get(AT_LIST) {
        return Ok(Some(list_to_rdf(values_of(list), list_triples, generator)?));
    }
    // 1, 2
    let mut value = match item.get(AT_VALUE) {
        Some(value) => value.clone(),
        None => {
            return Ok(item
                .get(AT_ID)
                .and_then(Value::as_str)
                .and_then(|id| IRIOrBlankNodeIdentifier::try_from(id.to_string()).ok())
                .map(Object::from));
        }
    };
    // 5, 6
    let mut datatype = match item.get(AT_TYPE) {
        None | Some(Value::Null) => None,
        Some(Value::String(datatype)) => {
            if datatype != AT_JSON && IRIRef::try_from(datatype.clone()).is_err() {
                return Ok(None);
            }
            Some(datatype.clone())
        }
        Some(_) => return Ok(None),
    };
    // 7
    let language = match item.get(AT_LANGUAGE) {
        None => None,
        // BCP47 tags compare case-insensitively, emit them lowercase.
        Some(Value::String(language)) => match Lang::from_str(&language.to_lowercase()) {
            Ok(language) => Some(language),
            Err(_) => {
                warn!("skipping value with malformed language tag: {}", language);
                return Ok(None);
            }
        },
        Some(_) => return Ok(None),
    };
    // 8
    if datatype.as_deref() == Some(AT_JSON) {
        value = Value::String(canonicalize_json(&value)?);
        datatype = Some(RDF_JSON.to_string());
    }
    let lexical_form = match value {
        // 9
        Value::Bool(boolean) => {
            datatype.get_or_insert_with(|| XSD_BOOLEAN.to_string());
            boolean.to_string()
        }
        Value::Number(number) => {
            let double = number.as_f64().ok_or(Error::SerializeDouble)?;
            if double.fract() != 0.0
                || double.abs() >= 1e21
                || datatype.as_deref() == Some(XSD_DOUBLE)
            {
                // 10
                datatype.get_or_insert_with(|| XSD_DOUBLE.to_string());
                canonical_double(double)
            } else {
                // 11
                datatype.get_or_insert_with(|| XSD_INTEGER.to_string());
                if number.is_i64() || number.is_u64() {
                    number.to_string()
                } else if double == 0.0 {
                    "0".to_string()
                } else {
                    format!("{:.0}", double)
                }
            }
        }
        // 12
        Value::String(string) => {
            if datatype.is_none() {
                datatype = Some(match language {
                    Some(_) => LANG_STRING_IRI_STR.to_string(),
                    None => XSD_STRING.to_string(),
                });
            }
            string
        }
        _ => return Err(Error::ExpectedString),
    };
    let string = StringLiteral(lexical_form);
    // 14
    let literal = match (language, datatype) {
        (Some(lang), _) => Literal::LangTagged { string, lang },
        (None, Some(datatype)) if datatype != XSD_STRING => Literal::Typed {
            string,
            type_: IRIRef(datatype),
        },
        (None, _) => Literal::String { string },
    };
    // 15
    Ok(Some(Object::Literal(literal)))
}

/// <https://www.w3.org/TR/json-ld11/#the-rdf-json-datatype>
pub fn canonicalize_json(value: &Value) -> Result<String, Error> {
    Ok(serde_jcs::to_string(value)?)
}

/// <https://www.w3.org/TR/json-ld11-api/#list-to-rdf-conversion>
pub fn list_to_rdf(
    list: &[Value],
    list_triples: &mut Vec<Statement>,
    generator: &mut BlankNodeIdentifierGenerator,
) -> Result<Object, Error> {
    // 2
    let bnodes: Vec<String> = list.iter().map(|_| generator.generate(None)).collect();
    // 3
    for (i, (bnode, item)) in bnodes.iter().zip(list).enumerate() {
        let subject = Subject::BlankNodeLabel(BlankNodeLabel(bnode.clone()));
        // 3.1, 3.2
        let mut embedded_triples = Vec::new();
        // 3.3
        if let Some(object) = object_to_rdf(item, &mut embedded_triples, generator)? {
            list_triples.push(Statement {
                subject: subject.clone(),
                predicate: Predicate::iri(RDF_FIRST),
                object,
                graph_label: None,
            });
        }
        // 3.4
        let rest = match bnodes.get(i + 1) {
            Some(next) => Object::BlankNodeLabel(BlankNodeLabel(next.clone())),
            None => Object::IRIRef(IRIRef(RDF_NIL.to_string())),
        };
        list_triples.push(Statement {
            subject,
            predicate: Predicate::iri(RDF_REST),
            object: rest,
            graph_label: None,
        });
        // 3.5
        list_triples.append(&mut embedded_triples);
    }
    // 1, 4
    Ok(match bnodes.first() {
        Some(first) => Object::BlankNodeLabel(BlankNodeLabel(first.clone())),
        None => Object::IRIRef(IRIRef(RDF_NIL.to_string())),
    })
}

/// Expansion policy of strict mode: properties the context does not define
/// and types that do not expand to an absolute IRI are errors. Relative node
/// identifiers are rejected after expansion.
const STRICT_POLICY: Policy = Policy {
    invalid: Action::Reject,
    vocab: Action::Keep,
    allow_undefined: false,
};

/// Expand a JSON-LD document, resolving contexts with `resolver`.
///
/// When `lax` is false, expansion uses [`STRICT_POLICY`].
pub fn expand_json(
    document: &Value,
    resolver: &dyn ContextResolver,
    lax: bool,
) -> Result<Vec<Value>, Error> {
    let input = RemoteDocument::new(
        None,
        None,
        json_syntax::Value::from_serde_json(document.clone()),
    );
    let options = Options {
        expansion_policy: if lax { Policy::default() } else { STRICT_POLICY },
        ..Default::default()
    };
    let expanded = block_on(input.expand_using(&ResolverLoader(resolver), options))
        .map_err(JsonLdError::from)?;
    let expanded: Vec<Value> = expanded
        .into_iter()
        .map(|object| object.into_json_with(&()).into_serde_json())
        .collect();
    if !lax {
        for object in &expanded {
            check_identifiers(object)?;
        }
    }
    Ok(expanded)
}

/// Reject node identifiers that are neither absolute IRIs nor blank node
/// identifiers. `@value` contents are literals and are not inspected.
fn check_identifiers(value: &Value) -> Result<(), JsonLdError> {
    match value {
        Value::Array(items) => items.iter().try_for_each(check_identifiers),
        Value::Object(object) => {
            if let Some(Value::String(id)) = object.get(AT_ID) {
                if !is_blank_node_identifier(id) && Iri::new(id.as_str()).is_err() {
                    return Err(JsonLdError::RelativeId(id.clone()));
                }
            }
            object
                .iter()
                .filter(|(key, _)| key.as_str() != AT_VALUE)
                .try_for_each(|(_, value)| check_identifiers(value))
        }
        _ => Ok(()),
    }
}

/// <https://www.w3.org/TR/json-ld11-api/#dom-jsonldprocessor-tordf>
pub fn json_to_dataset(
    document: &Value,
    resolver: &dyn ContextResolver,
    lax: bool,
) -> Result<DataSet, Error> {
    let expanded = expand_json(document, resolver, lax)?;
    let mut node_map = NodeMap::new();
    node_map.insert(AT_DEFAULT.to_string(), Map::new());
    let mut generator = BlankNodeIdentifierGenerator::default();
    generate_node_map(
        Value::Array(expanded),
        &mut node_map,
        AT_DEFAULT,
        None,
        None,
        None,
        &mut generator,
    )?;
    let mut dataset = DataSet::default();
    json_ld_to_rdf(&node_map, &mut dataset, &mut generator)?;
    debug!("converted JSON-LD document to {} quads", dataset.len());
    Ok(dataset)
}
