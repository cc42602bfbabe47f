#[cfg(test)]
mod test_equation {
    use pretty_assertions::assert_eq;
    use sbmlutils::equation::{parse_equation, EquationPart, Stoichiometry};
    use sbmlutils::prelude::*;
    use sbmlutils::report::reaction_equation;

    /// Parses reactants, products and modifiers of an irreversible
    /// equation and formats it back.
    #[test]
    fn test_parse_equation_with_modifiers() {
        // ACT
        let equation = parse_equation("1.0 S1 + 2 S2 => 2.0 P1 + 2 P2 [M1, M2]").unwrap();

        // ASSERT
        assert!(!equation.reversible);
        assert_eq!(
            equation.reactants,
            vec![
                EquationPart::new("S1", Stoichiometry::Constant(1.0)),
                EquationPart::new("S2", Stoichiometry::Constant(2.0)),
            ]
        );
        assert_eq!(
            equation.products,
            vec![
                EquationPart::new("P1", Stoichiometry::Constant(2.0)),
                EquationPart::new("P2", Stoichiometry::Constant(2.0)),
            ]
        );
        assert_eq!(equation.modifiers, vec!["M1", "M2"]);
        insta::assert_snapshot!(equation.to_string(), @"S1 + 2 S2 => 2 P1 + 2 P2 [M1, M2]");
    }

    /// Formatting a parsed equation and parsing it again yields the same
    /// equation.
    #[test]
    fn test_format_parse_roundtrip() {
        let equations = [
            "1.0 S1 + 2 S2 => 2.0 P1 + 2 P2 [M1, M2]",
            "A <-> B",
            "glc + atp <=> g6p + adp [hk]",
            "=> 2 c__glc",
            "c__glc ->",
            "f1 c__gal1p => f1 * c__gal + 2 c__phos [c__udp; c__utp]",
            "0.5 A + 1e-3 B => C",
        ];
        for s in equations {
            let parsed = parse_equation(s).unwrap();
            let formatted = parsed.to_string();
            assert_eq!(parse_equation(&formatted).unwrap(), parsed, "{s} -> {formatted}");
        }
    }

    #[test]
    fn test_formatting_boundaries() {
        let formatted: Vec<String> = ["A + 1 B -> 1.0 C []", "-> A", "k * A => B"]
            .iter()
            .map(|s| parse_equation(s).unwrap().to_string())
            .collect();
        insta::assert_debug_snapshot!(formatted, @r#"
        [
            "A + B => C",
            "=> A",
            "k * A => B",
        ]
        "#);
    }

    /// The equation of a built reaction matches the descriptor equation.
    #[test]
    fn test_built_reaction_keeps_equation() {
        let species = |sid: &str| {
            SpeciesBuilder::default()
                .meta(sid)
                .compartment("c")
                .initial_amount(0.0)
                .has_only_substance_units(true)
                .build()
                .unwrap()
        };
        let mut descriptor = ModelDescriptorBuilder::default();
        descriptor
            .mid("equations")
            .to_compartments(CompartmentBuilder::default().meta("c").value(1.0).build().unwrap())
            .to_reactions(
                ReactionBuilder::default()
                    .meta("v1")
                    .equation("1.0 S1 + 2 S2 => 2.0 P1 + 2 P2 [M1, M2]")
                    .build()
                    .unwrap(),
            );
        for sid in ["S1", "S2", "P1", "P2", "M1", "M2"] {
            descriptor.to_species(species(sid));
        }
        let descriptor = descriptor.build().unwrap();

        let model = build(&descriptor).unwrap().document.model.unwrap();
        let reaction = model.reaction("v1").unwrap();
        assert!(!reaction.reversible);
        assert_eq!(
            reaction_equation(reaction),
            parse_equation("S1 + 2 S2 => 2 P1 + 2 P2 [M1, M2]").unwrap()
        );
    }
}
