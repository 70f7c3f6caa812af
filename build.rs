use std::collections::HashSet;
use std::path::Path;

fn main() {
    let taxonomy_path = Path::new("taxonomy/sample_taxonomy.json");
    let taxonomy = read_json(taxonomy_path);
    validate_taxonomy_structure(&taxonomy);

    let groups_path = Path::new("taxonomy/species_groups.json");
    let groups = read_json(groups_path);
    validate_species_groups(&groups);

    set_build_dependencies();
}

fn read_json(path: &Path) -> serde_json::Value {
    // Ensure data file exists at build time
    assert!(
        path.exists(),
        "\n\nTAXONOMY BUILD ERROR: File not found\n\
         Path: {}\n\
         Please create the file before building.\n",
        path.display()
    );

    let contents = std::fs::read_to_string(path).unwrap_or_else(|e| {
        panic!(
            "\n\nTAXONOMY BUILD ERROR: Failed to read file\n\
             Path: {}\n\
             Error: {e}\n",
            path.display()
        );
    });

    serde_json::from_str(&contents).unwrap_or_else(|e| {
        panic!(
            "\n\nTAXONOMY BUILD ERROR: Invalid JSON\n\
             Path: {}\n\
             Error: {e}\n\
             Hint: Check for missing commas, brackets, or invalid syntax.\n",
            path.display()
        );
    })
}

fn validate_taxonomy_structure(taxonomy: &serde_json::Value) {
    assert!(
        taxonomy.is_object(),
        "\n\nTAXONOMY BUILD ERROR: Root must be a JSON object\n"
    );

    let taxa = taxonomy
        .get("taxa")
        .and_then(serde_json::Value::as_array)
        .unwrap_or_else(|| {
            panic!(
                "\n\nTAXONOMY BUILD ERROR: Missing 'taxa' array\n\
                 The taxonomy must have a top-level 'taxa' array.\n"
            );
        });

    let ids = validate_taxa(taxa);
    validate_links(taxa, &ids);

    println!(
        "cargo:warning=Validated taxonomy: {} taxa",
        taxa.len()
    );
}

fn validate_taxa(taxa: &[serde_json::Value]) -> HashSet<String> {
    let mut ids = HashSet::new();

    for (i, taxon) in taxa.iter().enumerate() {
        let taxon_id = taxon
            .get("taxonID")
            .and_then(|v| v.as_str())
            .unwrap_or_else(|| {
                panic!("\n\nTAXONOMY BUILD ERROR: Taxon at index {i} missing 'taxonID' field\n");
            });

        assert!(
            taxon.get("scientificName").and_then(|v| v.as_str()).is_some(),
            "\n\nTAXONOMY BUILD ERROR: Taxon '{taxon_id}' (index {i}) missing 'scientificName' field\n"
        );

        assert!(
            ids.insert(taxon_id.to_string()),
            "\n\nTAXONOMY BUILD ERROR: Duplicate taxonID '{taxon_id}' (index {i})\n"
        );
    }

    ids
}

fn validate_links(taxa: &[serde_json::Value], ids: &HashSet<String>) {
    for taxon in taxa {
        let taxon_id = taxon.get("taxonID").and_then(|v| v.as_str()).unwrap_or("<unknown>");

        for field in ["parentID", "acceptedID"] {
            if let Some(target) = taxon.get(field).and_then(|v| v.as_str()) {
                assert!(
                    ids.contains(target),
                    "\n\nTAXONOMY BUILD ERROR: Taxon '{taxon_id}' {field} '{target}' does not exist\n"
                );
            }
        }
    }
}

fn validate_species_groups(groups: &serde_json::Value) {
    let groups = groups.as_array().unwrap_or_else(|| {
        panic!("\n\nTAXONOMY BUILD ERROR: Species groups must be a JSON array\n");
    });

    let names: HashSet<&str> = groups
        .iter()
        .filter_map(|g| g.get("name").and_then(|v| v.as_str()))
        .collect();

    for (i, group) in groups.iter().enumerate() {
        let name = group
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_else(|| {
                panic!("\n\nTAXONOMY BUILD ERROR: Species group at index {i} missing 'name' field\n");
            });

        assert!(
            group.get("rank").and_then(|v| v.as_str()).is_some(),
            "\n\nTAXONOMY BUILD ERROR: Species group '{name}' missing 'rank' field\n"
        );

        let included = group.get("included").and_then(|v| v.as_array());
        assert!(
            included.is_some_and(|v| !v.is_empty()),
            "\n\nTAXONOMY BUILD ERROR: Species group '{name}' must include at least one taxon\n"
        );

        if let Some(parent) = group.get("parent").and_then(|v| v.as_str()) {
            assert!(
                names.contains(parent),
                "\n\nTAXONOMY BUILD ERROR: Species group '{name}' has unknown parent '{parent}'\n"
            );
        }
    }
}

fn set_build_dependencies() {
    // Tell cargo to rerun if embedded data changes
    println!("cargo:rerun-if-changed=taxonomy/sample_taxonomy.json");
    println!("cargo:rerun-if-changed=taxonomy/species_groups.json");

    // Tell cargo to rerun if build.rs changes
    println!("cargo:rerun-if-changed=build.rs");
}
