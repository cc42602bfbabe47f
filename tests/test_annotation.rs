#[cfg(test)]
mod test_annotation {
    use pretty_assertions::assert_eq;
    use sbmlutils::annotation::{annotate_model, read_annotations, AnnotationError, Qualifier};
    use sbmlutils::prelude::*;
    use sbmlutils::sbml::{Package, SBase};

    const GALACTOSE: &str = "https://identifiers.org/chebi/CHEBI:28061";

    fn document() -> SbmlDocument {
        document_with(vec![Package::Fbc])
    }

    fn document_with(packages: Vec<Package>) -> SbmlDocument {
        let species = |sid: &str| {
            SpeciesBuilder::default()
                .meta(sid)
                .compartment("c")
                .initial_concentration(1.0)
                .build()
                .unwrap()
        };
        let descriptor = ModelDescriptorBuilder::default()
            .mid("galactose")
            .packages(packages)
            .to_compartments(CompartmentBuilder::default().meta("c").value(1.0).build().unwrap())
            .to_species(species("c__gal"))
            .to_species(species("e__gal"))
            .to_species(species("c__glc"))
            .build()
            .unwrap();
        build(&descriptor).unwrap().document
    }

    fn resources(sbase: &SBase, qualifier: Qualifier) -> Vec<String> {
        sbase
            .cv_terms
            .iter()
            .filter(|term| term.qualifier == qualifier)
            .flat_map(|term| term.resources.clone())
            .collect()
    }

    /// Every species matching the pattern gains the CV term.
    #[test]
    fn test_annotations_from_json_file() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.json");
        std::fs::write(
            &path,
            r#"[
                {"pattern": ".*__gal", "sbml_type": "species", "annotation_type": "rdf",
                 "qualifier": "BQB_IS", "resource": "chebi/CHEBI:28061", "name": "galactose"}
            ]"#,
        )
        .unwrap();
        let mut doc = document();

        // ACT
        let annotations = read_annotations(&path).unwrap();
        let issues = annotate_model(&mut doc, &annotations);

        // ASSERT
        assert!(issues.is_empty(), "{issues:?}");
        let model = doc.model.as_ref().unwrap();
        for sid in ["c__gal", "e__gal"] {
            let species = model.species(sid).unwrap();
            assert_eq!(
                resources(&species.sbase, Qualifier::BQB_IS),
                vec![GALACTOSE.to_string()]
            );
            assert!(species.sbase.metaid.is_some());
        }
        assert!(model.species("c__glc").unwrap().sbase.cv_terms.is_empty());

        let xml = write_sbml(&doc).unwrap();
        assert!(xml.contains(GALACTOSE));
    }

    /// SBO resources set the SBO term, formula and charge rows set the fbc
    /// species attributes.
    #[cfg(feature = "tabular")]
    #[test]
    fn test_annotations_from_tsv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.tsv");
        let rows = [
            "pattern\tsbml_type\tannotation_type\tqualifier\tresource\tname",
            "c\tcompartment\trdf\tBQB_IS\tsbo/SBO:0000290\tcompartment",
            ".*__gal\tspecies\tformula\t\tC6H12O6\t",
            ".*__gal\tspecies\tcharge\t\t0\t",
        ];
        std::fs::write(&path, rows.join("\n")).unwrap();
        let mut doc = document();

        let annotations = read_annotations(&path).unwrap();
        assert_eq!(annotations.len(), 3);
        let issues = annotate_model(&mut doc, &annotations);
        assert!(issues.is_empty(), "{issues:?}");

        let model = doc.model.as_ref().unwrap();
        assert_eq!(
            model.compartments[0].sbase.sbo_term.as_deref(),
            Some("SBO:0000290")
        );
        let gal = model.species("e__gal").unwrap();
        assert_eq!(gal.chemical_formula.as_deref(), Some("C6H12O6"));
        assert_eq!(gal.charge, Some(0));
        assert_eq!(model.species("c__glc").unwrap().chemical_formula, None);
    }

    #[test]
    fn test_unknown_qualifier_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.json");
        std::fs::write(
            &path,
            r#"[{"pattern": "c", "sbml_type": "compartment", "annotation_type": "rdf",
                 "qualifier": "BQB_UNKNOWN", "resource": "go/GO:0005829"}]"#,
        )
        .unwrap();
        assert!(read_annotations(&path).is_err());
    }

    /// Charge and formula rows need the fbc package and integral charges.
    #[test]
    fn test_species_attributes_are_checked() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.json");
        std::fs::write(
            &path,
            r#"[
                {"pattern": "c__glc", "sbml_type": "species", "annotation_type": "charge", "resource": "0.5"},
                {"pattern": "e__gal", "sbml_type": "species", "annotation_type": "formula", "resource": "C6H12O6"}
            ]"#,
        )
        .unwrap();
        let annotations = read_annotations(&path).unwrap();

        // ACT
        let mut with_fbc = document();
        let fbc_issues = annotate_model(&mut with_fbc, &annotations);
        let mut without_fbc = document_with(vec![]);
        let plain_issues = annotate_model(&mut without_fbc, &annotations);

        // ASSERT
        assert_eq!(fbc_issues.len(), 1);
        assert!(matches!(fbc_issues[0], AnnotationError::InvalidCharge(_)));
        let model = with_fbc.model.as_ref().unwrap();
        assert_eq!(model.species("c__glc").unwrap().charge, None);
        assert_eq!(
            model.species("e__gal").unwrap().chemical_formula.as_deref(),
            Some("C6H12O6")
        );

        assert_eq!(plain_issues.len(), 2);
        assert!(plain_issues
            .iter()
            .all(|issue| matches!(issue, AnnotationError::FbcNotEnabled { .. })));
        assert!(write_sbml(&without_fbc).is_ok());
    }
}
