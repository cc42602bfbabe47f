#[cfg(test)]
mod test_cli {
    use std::path::{Path, PathBuf};
    use std::process::{Command, Output};

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    /// Model with two parameters of different units summed in a rule.
    const MIXED_UNITS: &str = r#"{
        "mid": "mixed",
        "compartments": [{"sid": "c", "value": 1.0, "unit": "litre"}],
        "parameters": [
            {"sid": "a", "value": 1.0, "unit": "litre"},
            {"sid": "b", "value": 1.0, "unit": "mole"}
        ],
        "rules": [{"sid": "x", "value": "a + b", "unit": "litre"}]
    }"#;

    const SUBMODEL: &str = r#"{
        "mid": "submodel",
        "compartments": [{"sid": "ext", "value": 1.0}],
        "parameters": [{"sid": "k", "value": 0.1}]
    }"#;

    const MASTER: &str = r#"{
        "mid": "master",
        "packages": ["comp"],
        "compartments": [{"sid": "c", "value": 2.0}],
        "external_model_definitions": [
            {"sid": "sub_def", "source": "submodel.xml", "model_ref": "submodel"}
        ],
        "submodels": [{"sid": "sub", "model_ref": "sub_def"}]
    }"#;

    fn sbmlutils(args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_sbmlutils"))
            .args(args)
            .env("NO_COLOR", "1")
            .output()
            .expect("failed to run the sbmlutils binary")
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn arg(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    fn stdout(output: &Output) -> String {
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// Builds the submodel and master files of a hierarchical model.
    fn hierarchical_modules(dir: &TempDir) -> PathBuf {
        let submodel = write(dir, "submodel.json", SUBMODEL);
        let output = sbmlutils(&[
            "build",
            arg(&submodel),
            "--out",
            arg(&dir.path().join("submodel.xml")),
        ]);
        assert_eq!(output.status.code(), Some(0), "{output:?}");
        write(dir, "master.json", MASTER)
    }

    /// Building merges the modules in order and writes the SBML file.
    #[test]
    fn test_build_writes_document() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let core = write(
            &dir,
            "core.json",
            r#"{"mid": "merged", "compartments": [{"sid": "c", "value": 1.0}]}"#,
        );
        let extra = write(&dir, "extra.json", r#"{"parameters": [{"sid": "k", "value": 2.0}]}"#);
        let out = dir.path().join("model.xml");

        // ACT
        let output = sbmlutils(&["build", arg(&core), arg(&extra), "--out", arg(&out), "--summary"]);

        // ASSERT
        assert_eq!(output.status.code(), Some(0), "{output:?}");
        let xml = std::fs::read_to_string(&out).unwrap();
        assert!(xml.contains(r#"id="merged""#));
        assert!(xml.contains(r#"id="k""#));
        assert!(stdout(&output).contains("Written"));
    }

    /// Unit mismatches are reported by the build unless the units check is
    /// switched off. Neither case changes the exit code.
    #[test]
    fn test_build_units_check_flag() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let module = write(&dir, "mixed.json", MIXED_UNITS);
        let checked = dir.path().join("checked.xml");
        let unchecked = dir.path().join("unchecked.xml");

        // ACT
        let with_check = sbmlutils(&["build", arg(&module), "--out", arg(&checked)]);
        let without_check = sbmlutils(&[
            "build",
            arg(&module),
            "--out",
            arg(&unchecked),
            "--no-units-check",
        ]);

        // ASSERT
        assert_eq!(with_check.status.code(), Some(0), "{with_check:?}");
        assert_eq!(without_check.status.code(), Some(0), "{without_check:?}");
        assert!(stdout(&with_check).contains("different units"));
        assert!(!stdout(&without_check).contains("different units"));
        assert!(checked.exists());
        assert!(unchecked.exists());
    }

    /// `--flatten` resolves external models next to the first module.
    #[test]
    fn test_build_with_flatten_flag() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let master = hierarchical_modules(&dir);
        let out = dir.path().join("flat.xml");

        // ACT
        let output = sbmlutils(&["build", arg(&master), "--out", arg(&out), "--flatten"]);

        // ASSERT
        assert_eq!(output.status.code(), Some(0), "{output:?}");
        let xml = std::fs::read_to_string(&out).unwrap();
        assert!(xml.contains(r#"id="sub__k""#));
        assert!(!xml.contains("comp:submodel"));
    }

    /// The flatten command turns a hierarchical file into a flat one and
    /// fails with exit code 1 on a missing input.
    #[test]
    fn test_flatten_command() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let master = hierarchical_modules(&dir);
        let comp = dir.path().join("master.xml");
        let built = sbmlutils(&["build", arg(&master), "--out", arg(&comp)]);
        assert_eq!(built.status.code(), Some(0), "{built:?}");
        let flat = dir.path().join("flat.xml");
        let missing = dir.path().join("missing.xml");

        // ACT
        let output = sbmlutils(&["flatten", arg(&comp), "--out", arg(&flat)]);
        let failed = sbmlutils(&["flatten", arg(&missing), "--out", arg(&flat)]);

        // ASSERT
        assert_eq!(output.status.code(), Some(0), "{output:?}");
        let xml = std::fs::read_to_string(&flat).unwrap();
        assert!(xml.contains(r#"id="sub__k""#));
        assert!(!xml.contains("comp:"));

        assert_eq!(failed.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&failed.stderr).contains("Error:"));
    }

    /// Validation exits with 1 only when the requested checks find errors,
    /// and `--json` prints a machine readable report.
    #[test]
    fn test_validate_command() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let module = write(&dir, "mixed.json", MIXED_UNITS);
        let model = dir.path().join("mixed.xml");
        let built = sbmlutils(&["build", arg(&module), "--out", arg(&model), "--no-units-check"]);
        assert_eq!(built.status.code(), Some(0), "{built:?}");

        // ACT
        let structural = sbmlutils(&["validate", arg(&model)]);
        let units = sbmlutils(&["validate", arg(&model), "--units", "--json"]);

        // ASSERT
        assert_eq!(structural.status.code(), Some(0), "{structural:?}");
        assert_eq!(units.status.code(), Some(1), "{units:?}");

        let report: serde_json::Value = serde_json::from_str(&stdout(&units)).unwrap();
        assert_eq!(report["is_valid"], serde_json::Value::Bool(false));
        let messages: Vec<&str> = report["results"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|result| result["message"].as_str())
            .collect();
        assert!(messages.iter().any(|m| m.contains("different units")), "{messages:?}");
    }

    /// The schema command writes the descriptor module schema as JSON.
    #[test]
    fn test_schema_command() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("schema.json");

        // ACT
        let to_file = sbmlutils(&["schema", "--out", arg(&out)]);
        let to_stdout = sbmlutils(&["schema"]);

        // ASSERT
        assert_eq!(to_file.status.code(), Some(0), "{to_file:?}");
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert!(written.is_object());

        assert_eq!(to_stdout.status.code(), Some(0), "{to_stdout:?}");
        let printed: serde_json::Value = serde_json::from_str(&stdout(&to_stdout)).unwrap();
        assert_eq!(printed, written);
    }

    /// Usage errors exit with 2, unreadable inputs with 1.
    #[test]
    fn test_exit_codes_for_bad_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let module = write(&dir, "model.json", SUBMODEL);
        let missing = dir.path().join("missing.json");
        let out = dir.path().join("model.xml");

        let missing_out = sbmlutils(&["build", arg(&module)]);
        assert_eq!(missing_out.status.code(), Some(2));

        let unknown_command = sbmlutils(&["simulate", arg(&module)]);
        assert_eq!(unknown_command.status.code(), Some(2));

        let bad_version = sbmlutils(&["build", arg(&module), "--out", arg(&out), "--sbml-version", "5"]);
        assert_eq!(bad_version.status.code(), Some(2));

        let missing_module = sbmlutils(&["build", arg(&missing), "--out", arg(&out)]);
        assert_eq!(missing_module.status.code(), Some(1));
        assert!(!out.exists());

        let missing_document = sbmlutils(&["validate", arg(&missing)]);
        assert_eq!(missing_document.status.code(), Some(1));
    }
}
