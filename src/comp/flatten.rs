//! Flattening of hierarchical models.
//!
//! Each submodel is flattened recursively, namespaced, reduced by its
//! deletions and replacements and merged into the containing model. External
//! model definitions are read relative to the directory of the document that
//! declares them.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::math::Math;
use crate::sbml::{
    read_sbml_file, ElementKind, Model, Package, RefTarget, RuleKind, SbmlDocument,
};

use super::namespace::{
    remove_dependents, remove_elements, rename_declarations, rename_references,
    strip_replacements, Renames,
};
use super::{CompositionError, FlattenOptions};

/// Reads an SBML file and flattens it, resolving external models relative to
/// the file's directory.
///
/// # Arguments
///
/// * `path` - Path of the hierarchical document
///
/// # Returns
///
/// A document without composition elements.
pub fn flatten_file(path: impl AsRef<Path>) -> Result<SbmlDocument, CompositionError> {
    let path = path.as_ref();
    let doc = read_sbml_file(path)?;
    let options = FlattenOptions {
        base_dir: path.parent().map(Path::to_path_buf),
    };
    flatten_document(&doc, &options)
}

/// Flattens a hierarchical document.
///
/// # Arguments
///
/// * `doc` - Document whose model may contain submodels
/// * `options` - Base directory for external model definitions
///
/// # Returns
///
/// A copy of the document with all submodels merged into the main model,
/// without ports, replacements and model definitions, and with the comp
/// package disabled. The input document is left untouched.
pub fn flatten_document(
    doc: &SbmlDocument,
    options: &FlattenOptions,
) -> Result<SbmlDocument, CompositionError> {
    let model = doc.model.as_ref().ok_or(CompositionError::NoModel)?;
    let source = Source {
        doc: doc.clone(),
        base_dir: options.base_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
        location: "<document>".to_string(),
    };
    log::info!("Flattening model '{}'", model.sbase.id());

    let mut stack = vec![source.key(model.sbase.id())];
    let mut packages = doc.packages.clone();
    let mut flat = flatten_model(model, &source, &mut stack, &mut packages)?;
    flat.ports.clear();

    let mut flattened = SbmlDocument {
        level: doc.level,
        version: doc.version,
        packages,
        model: Some(flat),
        model_definitions: Vec::new(),
        external_model_definitions: Vec::new(),
    };
    flattened.disable_package(Package::Comp);
    Ok(flattened)
}

/// Document a model was loaded from.
#[derive(Debug, Clone)]
struct Source {
    doc: SbmlDocument,
    base_dir: PathBuf,
    location: String,
}

impl Source {
    fn key(&self, model_id: &str) -> String {
        format!("{}#{model_id}", self.location)
    }

    /// Finds the model behind a submodel's `modelRef`, either a model
    /// definition of this document or an external model definition.
    fn load(&self, submodel: &str, model_ref: &str) -> Result<(Model, Source), CompositionError> {
        if let Some(model) = self
            .doc
            .model_definitions
            .iter()
            .find(|m| m.sbase.id() == model_ref)
        {
            return Ok((model.clone(), self.clone()));
        }

        let external = self
            .doc
            .external_model_definitions
            .iter()
            .find(|e| e.sbase.id() == model_ref)
            .ok_or_else(|| CompositionError::MissingModel {
                submodel: submodel.to_string(),
                model_ref: model_ref.to_string(),
            })?;

        let relative = external
            .source
            .strip_prefix("file://")
            .or_else(|| external.source.strip_prefix("file:"))
            .unwrap_or(&external.source);
        let path = self.base_dir.join(relative);
        let path = path
            .canonicalize()
            .map_err(|e| CompositionError::ExternalModel {
                location: path.display().to_string(),
                reason: e.to_string(),
            })?;
        log::debug!("Loading external model '{model_ref}' from {}", path.display());

        let doc = read_sbml_file(&path).map_err(|e| CompositionError::ExternalModel {
            location: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let model = match &external.model_ref {
            Some(id) => doc.find_model(id),
            None => doc.model.as_ref(),
        }
        .cloned()
        .ok_or_else(|| CompositionError::ExternalModel {
            location: path.display().to_string(),
            reason: format!(
                "no model '{}'",
                external.model_ref.as_deref().unwrap_or("<main>")
            ),
        })?;

        let source = Source {
            doc,
            base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            location: path.display().to_string(),
        };
        Ok((model, source))
    }
}

/// An element of a submodel taking the place of a containing-model element,
/// or the reverse.
struct Replacement {
    /// Id (or unit id) of the submodel element before namespacing
    replaced: String,
    kind: TargetKind,
    /// Id of the containing-model element
    replacement: String,
    conversion_factor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetKind {
    Id,
    Unit,
}

/// Element of a flattened submodel a comp reference points to.
#[derive(Debug, Clone, PartialEq)]
enum Resolved {
    Id(String),
    Unit(String),
    MetaId(String),
}

fn resolve(
    model: &Model,
    submodel: &str,
    target: &RefTarget,
) -> Result<Resolved, CompositionError> {
    let unresolved = || CompositionError::UnresolvedTarget {
        submodel: submodel.to_string(),
        target: target.to_string(),
    };
    match target {
        RefTarget::Port(port) => {
            let port = model.port(port).ok_or_else(unresolved)?;
            if matches!(port.target, RefTarget::Port(_)) {
                return Err(unresolved());
            }
            resolve(model, submodel, &port.target)
        }
        RefTarget::Id(id) => model
            .kind_of(id)
            .map(|_| Resolved::Id(id.clone()))
            .ok_or_else(unresolved),
        RefTarget::Unit(unit) => model
            .unit_definition(unit)
            .map(|_| Resolved::Unit(unit.clone()))
            .ok_or_else(unresolved),
        RefTarget::MetaId(metaid) => {
            let mut found = false;
            model.for_each_sbase(&mut |_, sbase| {
                found |= sbase.metaid.as_deref() == Some(metaid.as_str());
            });
            found
                .then(|| Resolved::MetaId(metaid.clone()))
                .ok_or_else(unresolved)
        }
    }
}

/// Id of the element behind a resolved reference, with its kind.
fn resolved_id(model: &Model, resolved: &Resolved) -> Option<(String, TargetKind)> {
    match resolved {
        Resolved::Id(id) => Some((id.clone(), TargetKind::Id)),
        Resolved::Unit(unit) => Some((unit.clone(), TargetKind::Unit)),
        Resolved::MetaId(metaid) => {
            let mut found = None;
            model.for_each_sbase(&mut |kind, sbase| {
                if found.is_none() && sbase.metaid.as_deref() == Some(metaid.as_str()) {
                    found = sbase.id.clone().map(|id| {
                        let kind = if kind == ElementKind::UnitDefinition {
                            TargetKind::Unit
                        } else {
                            TargetKind::Id
                        };
                        (id, kind)
                    });
                }
            });
            found
        }
    }
}

/// Resolves a replacement target to the id of its element. Targets whose
/// element has no id cannot be replaced.
fn resolve_id(model: &Model, submodel: &str, target: &RefTarget) -> Result<String, CompositionError> {
    let resolved = resolve(model, submodel, target)?;
    resolved_id(model, &resolved)
        .map(|(id, _)| id)
        .ok_or_else(|| CompositionError::UnresolvedTarget {
            submodel: submodel.to_string(),
            target: target.to_string(),
        })
}

fn delete(model: &mut Model, resolved: &Resolved) {
    match resolved {
        Resolved::Id(id) => {
            remove_elements(model, &|sbase| sbase.id.as_deref() == Some(id.as_str()));
            remove_dependents(model, id);
        }
        Resolved::Unit(unit) => model.unit_definitions.retain(|u| u.sbase.id() != unit),
        Resolved::MetaId(metaid) => {
            let id = resolved_id(model, resolved).map(|(id, _)| id);
            remove_elements(model, &|sbase| {
                sbase.metaid.as_deref() == Some(metaid.as_str())
            });
            if let Some(id) = id {
                remove_dependents(model, &id);
            }
        }
    }
}

/// Flattens `model` and every submodel below it. The result keeps the
/// model's own ports so that containing models can resolve port references.
/// Packages enabled by external documents are added to `packages`.
fn flatten_model(
    model: &Model,
    source: &Source,
    stack: &mut Vec<String>,
    packages: &mut Vec<Package>,
) -> Result<Model, CompositionError> {
    let mut flat = model.clone();
    let submodels = std::mem::take(&mut flat.submodels);
    if submodels.is_empty() {
        strip_replacements(&mut flat);
        return Ok(flat);
    }
    check_conversion_cycles(&flat)?;

    for submodel in &submodels {
        let sid = submodel.sbase.id();
        let (child, child_source) = source.load(sid, &submodel.model_ref)?;

        let key = child_source.key(child.sbase.id());
        if stack.contains(&key) {
            let mut cycle = stack.clone();
            cycle.push(key);
            return Err(CompositionError::ModelCycle(cycle));
        }
        for package in &child_source.doc.packages {
            if !packages.contains(package) {
                packages.push(*package);
            }
        }
        stack.push(key);
        let mut child = flatten_model(&child, &child_source, stack, packages)?;
        stack.pop();

        for deletion in &submodel.deletions {
            let resolved = resolve(&child, sid, &deletion.target)?;
            log::debug!("Deleting {} from submodel '{sid}'", deletion.target);
            delete(&mut child, &resolved);
        }

        let replacements = collect_replacements(&flat, &child, sid)?;
        instantiate(&mut flat, child, submodel, &replacements);
    }

    strip_replacements(&mut flat);
    Ok(flat)
}

/// Replacements between `parent` and the flattened submodel `child`.
fn collect_replacements(
    parent: &Model,
    child: &Model,
    submodel: &str,
) -> Result<(Vec<Replacement>, Vec<Replacement>), CompositionError> {
    let mut replaced = Vec::new();
    let mut replaced_by = Vec::new();
    let mut error = None;

    parent.for_each_sbase(&mut |kind, sbase| {
        if error.is_some() {
            return;
        }
        let Some(id) = sbase.id.as_deref() else {
            return;
        };
        let kind = if kind == ElementKind::UnitDefinition {
            TargetKind::Unit
        } else {
            TargetKind::Id
        };

        for re in sbase
            .replaced_elements
            .iter()
            .filter(|re| re.submodel_ref == submodel)
        {
            match resolve_id(child, submodel, &re.target) {
                Ok(target) => replaced.push(Replacement {
                    replaced: target,
                    kind,
                    replacement: id.to_string(),
                    conversion_factor: re.conversion_factor.clone(),
                }),
                Err(e) => error = Some(e),
            }
        }
        if let Some(rb) = sbase
            .replaced_by
            .as_ref()
            .filter(|rb| rb.submodel_ref == submodel)
        {
            match resolve_id(child, submodel, &rb.target) {
                Ok(target) => replaced_by.push(Replacement {
                    replaced: id.to_string(),
                    kind,
                    replacement: target,
                    conversion_factor: None,
                }),
                Err(e) => error = Some(e),
            }
        }
    });

    match error {
        Some(e) => Err(e),
        None => Ok((replaced, replaced_by)),
    }
}

/// Namespaces `child`, applies replacements and conversion factors and
/// merges it into `parent`.
fn instantiate(
    parent: &mut Model,
    mut child: Model,
    submodel: &crate::sbml::Submodel,
    (replaced, replaced_by): &(Vec<Replacement>, Vec<Replacement>),
) {
    let sid = submodel.sbase.id();
    let mut renames = Renames::prefixed(&child, sid);

    // submodel elements replaced by parent elements disappear
    let replaced_ids: HashSet<&str> = replaced
        .iter()
        .filter(|r| r.kind == TargetKind::Id)
        .map(|r| r.replaced.as_str())
        .collect();
    remove_elements(&mut child, &|sbase| {
        sbase
            .id
            .as_deref()
            .is_some_and(|id| replaced_ids.contains(id))
    });
    for r in replaced {
        let table = match r.kind {
            TargetKind::Id => &mut renames.ids,
            TargetKind::Unit => &mut renames.units,
        };
        table.insert(r.replaced.clone(), r.replacement.clone());
    }
    child
        .unit_definitions
        .retain(|u| !replaced.iter().any(|r| r.kind == TargetKind::Unit && r.replaced == u.sbase.id()));

    rename_declarations(&mut child, &renames);
    rename_references(&mut child, &renames);

    for r in replaced.iter().filter(|r| r.kind == TargetKind::Id) {
        if let Some(factor) = &r.conversion_factor {
            apply_conversion_factor(&mut child, &r.replacement, factor);
        }
    }
    if let Some(t) = &submodel.time_conversion_factor {
        apply_time_conversion(&mut child, t);
    }
    if let Some(x) = &submodel.extent_conversion_factor {
        for law in child.reactions.iter_mut().filter_map(|r| r.kinetic_law.as_mut()) {
            law.math = Math::times(law.math.clone(), Math::ident(x.clone()));
        }
    }

    // parent elements replaced by submodel elements disappear, their
    // references move to the namespaced submodel element
    let mut parent_renames = Renames::default();
    for r in replaced_by {
        let new = renames
            .ids
            .get(&r.replacement)
            .or_else(|| renames.units.get(&r.replacement))
            .cloned()
            .unwrap_or_else(|| r.replacement.clone());
        match r.kind {
            TargetKind::Id => {
                remove_elements(parent, &|sbase| sbase.id.as_deref() == Some(r.replaced.as_str()));
                parent_renames.ids.insert(r.replaced.clone(), new);
            }
            TargetKind::Unit => {
                parent.unit_definitions.retain(|u| u.sbase.id() != r.replaced);
                parent_renames.units.insert(r.replaced.clone(), new);
            }
        }
    }
    rename_references(parent, &parent_renames);

    merge(parent, child);
    log::debug!("Merged submodel '{sid}'");
}

/// Uses of `replacement` inside the submodel become `replacement / f`;
/// assignments to it are scaled by `f`.
fn apply_conversion_factor(model: &mut Model, replacement: &str, factor: &str) {
    let converted = Math::divide(Math::ident(replacement), Math::ident(factor));
    model.for_each_math_mut(&mut |_, math| math.substitute(replacement, &converted));

    let scale = |math: &mut Math| *math = Math::times(math.clone(), Math::ident(factor));
    for rule in model
        .rules
        .iter_mut()
        .filter(|r| r.variable.as_deref() == Some(replacement))
    {
        scale(&mut rule.math);
    }
    for ia in model
        .initial_assignments
        .iter_mut()
        .filter(|ia| ia.symbol == replacement)
    {
        scale(&mut ia.math);
    }
    for ea in model
        .events
        .iter_mut()
        .flat_map(|e| e.assignments.iter_mut())
        .filter(|ea| ea.variable == replacement)
    {
        scale(&mut ea.math);
    }
}

/// Rescales submodel time by the factor `t`.
fn apply_time_conversion(model: &mut Model, t: &str) {
    let time = Math::divide(Math::Time, Math::ident(t));
    model.for_each_math_mut(&mut |_, math| math.substitute_time(&time));

    for rule in model.rules.iter_mut().filter(|r| r.kind == RuleKind::Rate) {
        rule.math = Math::divide(rule.math.clone(), Math::ident(t));
    }
    for law in model.reactions.iter_mut().filter_map(|r| r.kinetic_law.as_mut()) {
        law.math = Math::divide(law.math.clone(), Math::ident(t));
    }
    for delay in model.events.iter_mut().filter_map(|e| e.delay.as_mut()) {
        *delay = Math::times(delay.clone(), Math::ident(t));
    }
}

/// Appends the elements of a namespaced submodel.
fn merge(parent: &mut Model, child: Model) {
    parent.function_definitions.extend(child.function_definitions);
    parent.unit_definitions.extend(child.unit_definitions);
    parent.compartments.extend(child.compartments);
    parent.species.extend(child.species);
    parent.parameters.extend(child.parameters);
    parent.initial_assignments.extend(child.initial_assignments);
    parent.rules.extend(child.rules);
    parent.constraints.extend(child.constraints);
    parent.reactions.extend(child.reactions);
    parent.events.extend(child.events);
    parent.objectives.extend(child.objectives);
    parent.gene_products.extend(child.gene_products);
}

/// Rejects replacements whose conversion factors depend on each other.
fn check_conversion_cycles(model: &Model) -> Result<(), CompositionError> {
    let mut factors: HashMap<String, Vec<String>> = HashMap::new();
    model.for_each_sbase(&mut |_, sbase| {
        if let Some(id) = sbase.id.as_deref() {
            for factor in sbase
                .replaced_elements
                .iter()
                .filter_map(|re| re.conversion_factor.clone())
            {
                factors.entry(id.to_string()).or_default().push(factor);
            }
        }
    });

    fn visit(
        node: &str,
        factors: &HashMap<String, Vec<String>>,
        path: &mut Vec<String>,
        done: &mut HashSet<String>,
    ) -> Option<Vec<String>> {
        if let Some(pos) = path.iter().position(|p| p == node) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        if done.contains(node) {
            return None;
        }
        path.push(node.to_string());
        for next in factors.get(node).into_iter().flatten() {
            if let Some(cycle) = visit(next, factors, path, done) {
                return Some(cycle);
            }
        }
        path.pop();
        done.insert(node.to_string());
        None
    }

    let mut done = HashSet::new();
    let mut roots: Vec<&String> = factors.keys().collect();
    roots.sort();
    for root in roots {
        if let Some(cycle) = visit(root, &factors, &mut Vec::new(), &mut done) {
            return Err(CompositionError::ConversionCycle(cycle));
        }
    }
    Ok(())
}
