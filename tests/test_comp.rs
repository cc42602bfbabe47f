#[cfg(test)]
mod test_comp {
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use sbmlutils::comp::CompositionError;
    use sbmlutils::prelude::*;
    use sbmlutils::sbml::Package;
    use tempfile::TempDir;

    fn no_validation() -> BuildOptions {
        BuildOptionsBuilder::default().validate(false).build().unwrap()
    }

    fn external(sid: &str, source: &str, model_ref: &str) -> ExternalModelDefinition {
        ExternalModelDefinition {
            meta: sid.into(),
            source: source.to_string(),
            model_ref: Some(model_ref.to_string()),
            md5: None,
        }
    }

    fn submodel(sid: &str, model_ref: &str) -> Submodel {
        Submodel {
            meta: sid.into(),
            model_ref: model_ref.to_string(),
            time_conversion_factor: None,
            extent_conversion_factor: None,
        }
    }

    fn write(descriptor: &ModelDescriptor, path: &Path) {
        let result = build_document(descriptor, &no_validation()).unwrap();
        write_sbml_file(&result.document, path).unwrap();
    }

    /// Submodel with compartment `ext` exposed through the port `ext_port`.
    fn submodel_descriptor() -> ModelDescriptor {
        let ext = Compartment {
            meta: Meta::new("ext").with_port(),
            value: Some(1.0.into()),
            spatial_dimensions: 3.0,
            unit: Some("litre".to_string()),
            constant: true,
        };
        ModelDescriptorBuilder::default()
            .mid("submodel")
            .packages(vec![Package::Comp])
            .to_compartments(ext)
            .to_species(
                SpeciesBuilder::default()
                    .meta("S_ext")
                    .compartment("ext")
                    .initial_concentration(1.0)
                    .build()
                    .unwrap(),
            )
            .to_parameters(Parameter::new("k", 0.1, None))
            .to_rules(Rule::assignment("amount_ext", "S_ext * ext"))
            .build()
            .unwrap()
    }

    /// Master model replacing the submodel compartment by its own `c`.
    fn master_descriptor() -> ModelDescriptor {
        ModelDescriptorBuilder::default()
            .mid("master")
            .packages(vec![Package::Comp])
            .to_compartments(
                CompartmentBuilder::default()
                    .meta("c")
                    .value(2.0)
                    .unit("litre")
                    .build()
                    .unwrap(),
            )
            .to_external_model_definitions(external("sub_def", "submodel.xml", "submodel"))
            .to_submodels(submodel("sub", "sub_def"))
            .to_replaced_elements(ReplacedElement {
                meta: "c_ext_rep".into(),
                element_ref: "c".to_string(),
                submodel_ref: "sub".to_string(),
                target: ComponentRef::port("ext_port"),
                conversion_factor: None,
            })
            .build()
            .unwrap()
    }

    fn hierarchical_files() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(&submodel_descriptor(), &dir.path().join("submodel.xml"));
        write(&master_descriptor(), &dir.path().join("master.xml"));
        dir
    }

    /// Flattening prefixes the submodel ids and redirects every reference
    /// to the replaced compartment onto the master compartment.
    #[test]
    fn test_flatten_external_submodel() {
        // ARRANGE
        let dir = hierarchical_files();

        // ACT
        let flat = flatten_file(dir.path().join("master.xml")).unwrap();

        // ASSERT
        assert!(!flat.has_package(Package::Comp));
        assert!(flat.external_model_definitions.is_empty());

        let model = flat.model.as_ref().unwrap();
        let compartments: Vec<_> = model.compartments.iter().map(|c| c.sbase.id()).collect();
        assert_eq!(compartments, vec!["c"]);
        assert!(model.compartment("sub__ext").is_none());

        let species = model.species("sub__S_ext").unwrap();
        assert_eq!(species.compartment, "c");
        assert!(model.parameter("sub__k").is_some());
        assert_eq!(model.rules[0].variable.as_deref(), Some("sub__amount_ext"));
        assert_eq!(model.rules[0].math.to_string(), "sub__S_ext * c");
        assert!(model.ports.is_empty());
        assert!(model.submodels.is_empty());

        let xml = write_sbml(&flat).unwrap();
        assert!(!xml.contains("comp:"));
        assert!(!xml.contains("sub__ext"));

        let report = check_consistency(&flat, &ValidationOptions::default());
        assert_eq!(report.errors().count(), 0, "{report}");
    }

    /// Flattening during the build resolves external files relative to
    /// the base directory.
    #[test]
    fn test_build_with_flatten_option() {
        let dir = hierarchical_files();
        let options = BuildOptionsBuilder::default()
            .flatten(true)
            .base_dir(dir.path())
            .build()
            .unwrap();

        let result = build_document(&master_descriptor(), &options).unwrap();
        let model = result.document.model.as_ref().unwrap();
        assert!(model.species("sub__S_ext").is_some());
        assert!(result.validation.unwrap().is_valid);
    }

    /// A flattening failure during the build keeps the hierarchical
    /// document available.
    #[test]
    fn test_failed_flatten_returns_document() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let options = BuildOptionsBuilder::default()
            .flatten(true)
            .base_dir(dir.path())
            .build()
            .unwrap();

        // ACT
        let failure = build_document(&master_descriptor(), &options).unwrap_err();

        // ASSERT
        assert!(matches!(
            failure.cause,
            BuildError::CompositionError(CompositionError::ExternalModel { .. })
        ));
        let document = failure.document.expect("unflattened document");
        assert!(document.has_package(Package::Comp));
        let model = document.model.as_ref().unwrap();
        assert_eq!(model.submodels[0].sbase.id(), "sub");
        assert_eq!(document.external_model_definitions[0].source, "submodel.xml");
    }

    /// Flattening a flat document changes nothing.
    #[test]
    fn test_flatten_is_idempotent() {
        let dir = hierarchical_files();
        let flat = flatten_file(dir.path().join("master.xml")).unwrap();

        let again = flatten_document(&flat, &FlattenOptions::default()).unwrap();
        assert_eq!(again, flat);
    }

    /// A model that includes itself through an external definition is
    /// reported as a cycle.
    #[test]
    fn test_self_referencing_external_model() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = ModelDescriptorBuilder::default()
            .mid("cyclic")
            .packages(vec![Package::Comp])
            .to_external_model_definitions(external("self_def", "cyclic.xml", "cyclic"))
            .to_submodels(submodel("inner", "self_def"))
            .build()
            .unwrap();
        write(&descriptor, &dir.path().join("cyclic.xml"));

        let result = flatten_file(dir.path().join("cyclic.xml"));
        assert!(matches!(result, Err(CompositionError::ModelCycle(_))));
    }

    /// Two files including each other are reported as a cycle.
    #[test]
    fn test_mutually_referencing_external_models() {
        let dir = tempfile::tempdir().unwrap();
        for (mid, other) in [("first", "second"), ("second", "first")] {
            let descriptor = ModelDescriptorBuilder::default()
                .mid(mid)
                .packages(vec![Package::Comp])
                .to_external_model_definitions(external(
                    &format!("{other}_def"),
                    &format!("{other}.xml"),
                    other,
                ))
                .to_submodels(submodel(&format!("{other}_sub"), &format!("{other}_def")))
                .build()
                .unwrap();
            write(&descriptor, &dir.path().join(format!("{mid}.xml")));
        }

        let result = flatten_file(dir.path().join("first.xml"));
        match result {
            Err(CompositionError::ModelCycle(cycle)) => assert!(cycle.len() >= 3),
            other => panic!("Expected a model cycle, got {other:?}"),
        }
    }
}
