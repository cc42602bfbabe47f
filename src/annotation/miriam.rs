//! Registry of identifiers.org collections
//!
//! A process-wide, read-only table of the collections used when annotating
//! biochemical models, each with the regular expression its terms must
//! match. The table is initialized lazily on first use.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::annotation::AnnotationError;

/// A MIRIAM collection with its term pattern.
#[derive(Debug)]
pub struct Collection {
    pub prefix: &'static str,
    pub name: &'static str,
    pub pattern: Regex,
}

/// (prefix, name, pattern)
const COLLECTIONS: &[(&str, &str, &str)] = &[
    ("bigg.compartment", "BiGG Compartment", r"^[a-z_A-Z]+$"),
    ("bigg.metabolite", "BiGG Metabolite", r"^[a-z_A-Z0-9]+$"),
    ("bigg.model", "BiGG Model", r"^[a-z_A-Z0-9]+$"),
    ("bigg.reaction", "BiGG Reaction", r"^[a-z_A-Z0-9]+$"),
    ("biomodels.db", "BioModels Database", r"^((BIOMD|MODEL)\d{10})|(BMID\d{12})$"),
    ("brenda", "BRENDA", r"^((\d+\.-\.-\.-)|(\d+\.\d+\.-\.-)|(\d+\.\d+\.\d+\.-)|(\d+\.\d+\.\d+\.\d+))$"),
    ("bto", "BRENDA Tissue Ontology", r"^BTO:\d{7}$"),
    ("chebi", "ChEBI", r"^CHEBI:\d+$"),
    ("chembl.compound", "ChEMBL compound", r"^CHEMBL\d+$"),
    ("cl", "Cell Type Ontology", r"^CL:\d{7}$"),
    ("cmo", "Clinical measurement ontology", r"^CMO:\d+$"),
    ("doi", "Digital Object Identifier", r"^(doi:)?\d{2}\.\d{4}.*$"),
    ("drugbank", "DrugBank", r"^DB\d{5}$"),
    ("ec-code", "Enzyme Nomenclature", r"^\d+\.-\.-\.-|\d+\.\d+\.-\.-|\d+\.\d+\.\d+\.-|\d+\.\d+\.\d+\.(n)?\d+$"),
    ("efo", "Experimental Factor Ontology", r"^\d{7}$"),
    ("ensembl", "Ensembl", r"^((ENS[FPTG]\d{11}(\.\d+)?)|(FB\w{2}\d{7})|(Y[A-Z]{2}\d{3}[a-zA-Z](-[A-Z])?)|([A-Z_a-z0-9]+(\.)?(t)?(\d+)?([a-z])?))$"),
    ("envo", "Environment Ontology", r"^ENVO:\d{7,8}$"),
    ("fma", "Foundational Model of Anatomy", r"^FMA:\d+$"),
    ("foodon", "Food Ontology", r"^[0-9]{8}$"),
    ("go", "Gene Ontology", r"^GO:\d{7}$"),
    ("hmdb", "HMDB", r"^HMDB\d+$"),
    ("inchi", "InChI", r"^InChI=1S?/[A-Za-z0-9.]+(\+[0-9]+)?(/[cnpqbtmsih][A-Za-z0-9\-+(),/?;.]+)*$"),
    ("inchikey", "InChIKey", r"^[A-Z]{14}-[A-Z]{10}(-[A-Z])?"),
    ("kegg.compound", "KEGG Compound", r"^C\d+$"),
    ("kegg.drug", "KEGG Drug", r"^D\d+$"),
    ("kegg.genes", "KEGG Genes", r"^\w+:[\w\d.\-]*$"),
    ("kegg.pathway", "KEGG Pathway", r"^\w{2,4}\d{5}$"),
    ("kegg.reaction", "KEGG Reaction", r"^R\d+$"),
    ("lipidmaps", "LIPID MAPS", r"^LM(FA|GL|GP|SP|ST|PR|SL|PK)[0-9]{4}([0-9a-zA-Z]{4,6})?$"),
    ("mamo", "Mathematical Modelling Ontology", r"^MAMO_\d{7}$"),
    ("mesh", "MeSH", r"^(C|D)\d{6,9}$"),
    ("metanetx.chemical", "MetaNetX chemical", r"^(MNXM\d+|BIOMASS|WATER)$"),
    ("metanetx.compartment", "MetaNetX compartment", r"^(MNX[CD]\d+|BOUNDARY|IN|OUT)$"),
    ("metanetx.reaction", "MetaNetX reaction", r"^(MNXR\d+|EMPTY)$"),
    ("mondo", "Mondo Disease Ontology", r"^MONDO:\d{7}$"),
    ("ncbigene", "NCBI Gene", r"^\d+$"),
    ("ncbiprotein", "NCBI Protein", r"^(\w+\d+(\.\d+)?)|(NP_\d+)$"),
    ("ncit", "NCI Thesaurus", r"^[CRP]\d+$"),
    ("obi", "Ontology for Biomedical Investigations", r"^OBI_\d{7}$"),
    ("omim", "OMIM", r"^[*#+%^]?\d{6}$"),
    ("opmi", "Ontology of Precision Medicine and Investigation", r"^OPMI_\d{7}$"),
    ("pato", "Phenotypic Quality Ontology", r"^PATO:\d{7}$"),
    ("pubchem.compound", "PubChem compound", r"^\d+$"),
    ("pubchem.substance", "PubChem substance", r"^\d+$"),
    ("pubmed", "PubMed", r"^\d+$"),
    ("reactome", "Reactome", r"(^(REACTOME:)?R-[A-Z]{3}-[0-9]+(-[0-9]+)?$)|(^REACT_\d+$)"),
    ("rhea", "Rhea", r"^\d{5}$"),
    ("sbo", "Systems Biology Ontology", r"^SBO:\d{7}$"),
    ("seed.compound", "SEED Compound", r"^cpd\d+$"),
    ("seed.reaction", "SEED Reactions", r"^rxn\d+$"),
    ("sio", "Semanticscience Integrated Ontology", r"^SIO_\d{6}$"),
    ("snomedct", "SNOMED CT", r"^(\w+)?\d+$"),
    ("taxonomy", "Taxonomy", r"^\d+$"),
    ("uberon", "UBERON", r"^UBERON:\d+$"),
    ("uniprot", "UniProt Knowledgebase", r"^([A-N,R-Z][0-9]([A-Z][A-Z, 0-9][A-Z, 0-9][0-9]){1,2})|([O,P,Q][0-9][A-Z, 0-9][A-Z, 0-9][A-Z, 0-9][0-9])(\.\d+)?$"),
    ("vto", "Vertebrate Taxonomy Ontology", r"^VTO:\d{7}$"),
];

lazy_static! {
    pub static ref MIRIAM_COLLECTIONS: HashMap<&'static str, Collection> = COLLECTIONS
        .iter()
        .filter_map(|(prefix, name, pattern)| {
            Regex::new(pattern).ok().map(|pattern| {
                (
                    *prefix,
                    Collection {
                        prefix,
                        name,
                        pattern,
                    },
                )
            })
        })
        .collect();
}

/// Checks that `term` is a valid identifier of `collection`.
pub fn check_term(collection: &str, term: &str) -> Result<(), AnnotationError> {
    let entry = MIRIAM_COLLECTIONS
        .get(collection)
        .ok_or_else(|| AnnotationError::UnknownCollection {
            collection: collection.to_string(),
            resource: format!("{collection}/{term}"),
        })?;

    if entry.pattern.is_match(term) {
        Ok(())
    } else {
        Err(AnnotationError::PatternMismatch {
            collection: collection.to_string(),
            term: term.to_string(),
            pattern: entry.pattern.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(MIRIAM_COLLECTIONS.len(), COLLECTIONS.len());
    }

    #[test]
    fn test_known_terms() {
        assert!(check_term("chebi", "CHEBI:28061").is_ok());
        assert!(check_term("sbo", "SBO:0000290").is_ok());
        assert!(check_term("taxonomy", "9606").is_ok());
        assert!(check_term("go", "GO:0005829").is_ok());
        assert!(check_term("uniprot", "P12345").is_ok());
        assert!(check_term("bigg.metabolite", "glc__D").is_ok());
        assert!(check_term("ec-code", "2.7.1.1").is_ok());
        assert!(check_term("sbo", "0000290").is_err());
    }
}
