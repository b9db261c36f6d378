use std::collections::BTreeMap as Map;
use std::collections::BTreeSet;

use crate::error::Error;
use crate::hash::sha256_lowerhex;
use crate::rdf::{BlankNodeLabel, DataSet, Predicate, Statement};

/// <https://www.w3.org/TR/rdf-canon/#canon-state>
#[derive(Debug, Clone)]
pub struct NormalizationState<'a> {
    pub blank_node_to_quads: Map<&'a str, Vec<&'a Statement>>,
    pub hash_to_blank_nodes: Map<String, Vec<&'a str>>,
    pub canonical_issuer: IdentifierIssuer,
}

/// <https://www.w3.org/TR/rdf-canon/#dfn-identifier-issuer>
#[derive(Debug, Clone)]
pub struct IdentifierIssuer {
    pub identifier_prefix: String,
    pub identifier_counter: u64,
    /// Pairs of (issued identifier, existing identifier) in issuance order.
    pub issued_identifiers_list: Vec<(String, String)>,
}

impl IdentifierIssuer {
    pub fn new(prefix: &str) -> Self {
        Self {
            identifier_prefix: prefix.to_string(),
            identifier_counter: 0,
            issued_identifiers_list: Vec::new(),
        }
    }

    pub fn find_issued_identifier(&self, existing_identifier: &str) -> Option<&str> {
        self.issued_identifiers_list
            .iter()
            .find(|(_, existing_id)| existing_id == existing_identifier)
            .map(|(issued_identifier, _)| issued_identifier.as_ref())
    }
}

#[derive(Debug, Clone)]
pub struct HashNDegreeQuadsOutput {
    pub hash: String,
    pub issuer: IdentifierIssuer,
}

/// <https://www.w3.org/TR/rdf-canon/#hash-1d-quads>
pub fn hash_first_degree_quads(
    normalization_state: &NormalizationState,
    reference_blank_node_identifier: &str,
) -> Result<String, Error> {
    // 1
    let mut nquads: Vec<String> = Vec::new();
    // 2
    if let Some(quads) = normalization_state
        .blank_node_to_quads
        .get(reference_blank_node_identifier)
    {
        // 3
        for quad in quads {
            // 3.1
            let mut quad: Statement = (*quad).clone();
            // 3.1.1
            for label in quad.blank_node_components_mut() {
                // 3.1.1.1
                label.0 = if label.0 == reference_blank_node_identifier {
                    "_:a".to_string()
                } else {
                    "_:z".to_string()
                };
            }
            nquads.push(String::from(&quad));
        }
    }
    // 4
    nquads.sort();
    // 5
    sha256_lowerhex(nquads.join("").as_bytes())
}

/// Canonicalize the blank node labels of a dataset with URDNA2015.
///
/// <https://www.w3.org/TR/rdf-canon/#canon-algorithm>
pub fn normalize(input_dataset: &DataSet) -> Result<DataSet, Error> {
    // 1
    let mut normalization_state = NormalizationState {
        blank_node_to_quads: Map::new(),
        hash_to_blank_nodes: Map::new(),
        canonical_issuer: IdentifierIssuer::new("_:c14n"),
    };
    // 2
    let input_dataset_quads = input_dataset.statements();
    for quad in input_dataset_quads.iter() {
        // 2.1
        for blank_node_identifier in quad.blank_node_components() {
            let quads = normalization_state
                .blank_node_to_quads
                .entry(&blank_node_identifier.0)
                .or_insert_with(Vec::new);
            // A statement may mention the same blank node more than once.
            if !quads.iter().any(|q| std::ptr::eq(*q, quad)) {
                quads.push(quad);
            }
        }
    }
    // 3
    let mut non_normalized_identifiers: BTreeSet<&str> = normalization_state
        .blank_node_to_quads
        .keys()
        .cloned()
        .collect();
    // 4
    let mut simple = true;
    // 5
    while simple {
        // 5.1
        simple = false;
        // 5.2
        normalization_state.hash_to_blank_nodes.clear();
        // 5.3
        for identifier in non_normalized_identifiers.iter() {
            // 5.3.1
            let hash = hash_first_degree_quads(&normalization_state, identifier)?;
            // 5.3.2
            normalization_state
                .hash_to_blank_nodes
                .entry(hash)
                .or_insert_with(Vec::new)
                .push(identifier);
        }
        // 5.4
        let mut hashes_to_remove = Vec::new();
        for (hash, identifier_list) in normalization_state.hash_to_blank_nodes.iter() {
            // 5.4.1
            let identifier = match identifier_list.as_slice() {
                [identifier] => *identifier,
                _ => continue,
            };
            // 5.4.2
            issue_identifier(&mut normalization_state.canonical_issuer, identifier);
            // 5.4.3
            non_normalized_identifiers.remove(identifier);
            // 5.4.4
            hashes_to_remove.push(hash.clone());
            // 5.4.5
            simple = true;
        }
        for hash in hashes_to_remove {
            normalization_state.hash_to_blank_nodes.remove(&hash);
        }
    }
    // 6
    let remaining = std::mem::take(&mut normalization_state.hash_to_blank_nodes);
    for (_hash, identifier_list) in remaining {
        // 6.1
        let mut hash_path_list: Vec<HashNDegreeQuadsOutput> = Vec::new();
        // 6.2
        for identifier in identifier_list {
            // 6.2.1
            if normalization_state
                .canonical_issuer
                .find_issued_identifier(identifier)
                .is_some()
            {
                continue;
            }
            // 6.2.2
            let mut temporary_issuer = IdentifierIssuer::new("_:b");
            // 6.2.3
            issue_identifier(&mut temporary_issuer, identifier);
            // 6.2.4
            hash_path_list.push(hash_n_degree_quads(
                &normalization_state,
                identifier,
                temporary_issuer,
            )?);
        }
        // 6.3
        hash_path_list.sort_by(|a, b| a.hash.cmp(&b.hash));
        for result in hash_path_list {
            // 6.3.1
            for (_, existing_identifier) in result.issuer.issued_identifiers_list {
                issue_identifier(
                    &mut normalization_state.canonical_issuer,
                    &existing_identifier,
                );
            }
        }
    }
    // 7
    let mut normalized_dataset = DataSet::default();
    for quad in input_dataset_quads.iter() {
        // 7.1
        let mut quad_copy = quad.clone();
        for label in quad_copy.blank_node_components_mut() {
            let canonical_identifier = normalization_state
                .canonical_issuer
                .find_issued_identifier(&label.0)
                .ok_or(Error::MissingIdentifier)?;
            label.0 = canonical_identifier.to_string();
        }
        // 7.2
        normalized_dataset.add_statement(quad_copy);
    }
    // 8
    Ok(normalized_dataset)
}

/// <https://www.w3.org/TR/rdf-canon/#issue-identifier>
pub fn issue_identifier(identifier_issuer: &mut IdentifierIssuer, existing_identifier: &str) -> String {
    // 1
    if let Some(id) = identifier_issuer.find_issued_identifier(existing_identifier) {
        return id.to_string();
    }
    // 2
    let issued_identifier = format!(
        "{}{}",
        identifier_issuer.identifier_prefix, identifier_issuer.identifier_counter
    );
    // 3
    identifier_issuer
        .issued_identifiers_list
        .push((issued_identifier.clone(), existing_identifier.to_string()));
    // 4
    identifier_issuer.identifier_counter += 1;
    // 5
    issued_identifier
}

/// <https://www.w3.org/TR/rdf-canon/#hash-nd-quads>
pub fn hash_n_degree_quads(
    normalization_state: &NormalizationState,
    identifier: &str,
    issuer: IdentifierIssuer,
) -> Result<HashNDegreeQuadsOutput, Error> {
    let mut issuer = issuer;
    // 1
    let mut hash_to_related_blank_nodes: Map<String, Vec<&BlankNodeLabel>> = Map::new();
    // 2
    if let Some(quads) = normalization_state.blank_node_to_quads.get(identifier) {
        // 3
        for quad in quads {
            // 3.1
            for (component, position) in quad.blank_node_components_with_position() {
                if component.0 != identifier {
                    // 3.1.1
                    let hash = hash_related_blank_node(
                        normalization_state,
                        &component.0,
                        quad,
                        &issuer,
                        position,
                    )?;
                    // 3.1.2
                    let related = hash_to_related_blank_nodes
                        .entry(hash)
                        .or_insert_with(Vec::new);
                    if !related.contains(&component) {
                        related.push(component);
                    }
                }
            }
        }
    }
    // 4
    let mut data_to_hash = String::new();
    // 5, in code point order of the related hashes
    for (related_hash, blank_node_list) in hash_to_related_blank_nodes {
        // 5.1
        data_to_hash.push_str(&related_hash);
        // 5.2
        let mut chosen_path = String::new();
        // 5.3
        let mut chosen_issuer = None;
        // 5.4
        'permutations: for permutation in combination::permutate::from_vec(&blank_node_list) {
            // 5.4.1
            let mut issuer_copy = issuer.clone();
            // 5.4.2
            let mut path = String::new();
            // 5.4.3
            let mut recursion_list: Vec<&str> = Vec::new();
            // 5.4.4
            for related in permutation {
                // 5.4.4.1
                if let Some(canonical_identifier) = normalization_state
                    .canonical_issuer
                    .find_issued_identifier(&related.0)
                {
                    path.push_str(canonical_identifier);
                // 5.4.4.2
                } else {
                    // 5.4.4.2.1
                    if issuer_copy.find_issued_identifier(&related.0).is_none() {
                        recursion_list.push(&related.0);
                    }
                    // 5.4.4.2.2
                    path.push_str(&issue_identifier(&mut issuer_copy, &related.0));
                }
                // 5.4.4.3
                if !chosen_path.is_empty() && path.len() >= chosen_path.len() && path > chosen_path
                {
                    continue 'permutations;
                }
            }
            // 5.4.5
            for related in recursion_list {
                // 5.4.5.1
                let result = hash_n_degree_quads(normalization_state, related, issuer_copy.clone())?;
                // 5.4.5.2
                path.push_str(&issue_identifier(&mut issuer_copy, related));
                // 5.4.5.3
                path.push('<');
                path.push_str(&result.hash);
                path.push('>');
                // 5.4.5.4
                issuer_copy = result.issuer;
                // 5.4.5.5
                if !chosen_path.is_empty() && path.len() >= chosen_path.len() && path > chosen_path
                {
                    continue 'permutations;
                }
            }
            // 5.4.6
            if chosen_path.is_empty() || path < chosen_path {
                chosen_path = path;
                chosen_issuer = Some(issuer_copy);
            }
        }
        // 5.5
        data_to_hash.push_str(&chosen_path);
        // 5.6
        issuer = chosen_issuer.ok_or(Error::MissingChosenIssuer)?;
    }
    // 6
    Ok(HashNDegreeQuadsOutput {
        hash: sha256_lowerhex(data_to_hash.as_bytes())?,
        issuer,
    })
}

/// <https://www.w3.org/TR/rdf-canon/#hash-related-blank-node>
pub fn hash_related_blank_node(
    normalization_state: &NormalizationState,
    related: &str,
    quad: &Statement,
    issuer: &IdentifierIssuer,
    position: char,
) -> Result<String, Error> {
    // 1
    let identifier = match normalization_state
        .canonical_issuer
        .find_issued_identifier(related)
    {
        Some(id) => id.to_string(),
        None => match issuer.find_issued_identifier(related) {
            Some(id) => id.to_string(),
            None => hash_first_degree_quads(normalization_state, related)?,
        },
    };
    // 2
    let mut input = position.to_string();
    // 3
    if position != 'g' {
        let Predicate::IRIRef(ref predicate) = quad.predicate;
        input.push('<');
        input.push_str(&predicate.0);
        input.push('>');
    }
    // 4
    input.push_str(&identifier);
    // 5
    sha256_lowerhex(input.as_bytes())
}
