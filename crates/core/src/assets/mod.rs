use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap, HashSet},
};

use serde::{Deserialize, Serialize};

use crate::{
    material::{MaterialType, PropertySet},
    BlobVizError, Result,
};

/// A named material and the property set it starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDefinition {
    pub id: String,
    pub name: String,
    #[serde(default = "MaterialDefinition::default_type")]
    pub material_type: MaterialType,
    #[serde(default)]
    pub properties: PropertySet,
}

impl MaterialDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, properties: PropertySet) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            material_type: MaterialType::User,
            properties,
        }
    }

    fn default_type() -> MaterialType {
        MaterialType::User
    }
}

/// Source of material definitions and of the host's current selection.
pub trait MaterialManager {
    fn material(&self, id: &str) -> Option<MaterialDefinition>;

    fn current_material(&self) -> Option<String>;
}

/// Registry for every material the visualiser can switch to.
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: RefCell<HashMap<String, MaterialDefinition>>,
    current: RefCell<Option<String>>,
}

impl MaterialLibrary {
    /// Empty library without presets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Library preloaded with the built-in presets.
    pub fn with_builtins() -> Self {
        let library = Self::new();
        {
            let mut materials = library.materials.borrow_mut();
            for definition in builtin_materials() {
                materials.insert(definition.id.clone(), definition);
            }
        }
        library
    }

    /// Adds or replaces a material. Built-in presets cannot be shadowed.
    pub fn register(&self, definition: MaterialDefinition) -> Result<()> {
        let mut materials = self.materials.borrow_mut();
        check_replaceable(&materials, &definition.id)?;
        insert(&mut materials, definition);
        Ok(())
    }

    /// Parses a JSON array of definitions and registers all of them, or
    /// none: the pack is checked in full before anything is inserted.
    pub fn load_json(&self, json: &str) -> Result<usize> {
        let definitions: Vec<MaterialDefinition> = serde_json::from_str(json)?;
        let mut materials = self.materials.borrow_mut();

        {
            let mut seen = HashSet::new();
            for definition in &definitions {
                if !seen.insert(definition.id.as_str()) {
                    return Err(BlobVizError::msg(format!(
                        "material `{}` appears twice in the pack",
                        definition.id
                    )));
                }
                check_replaceable(&materials, &definition.id)?;
            }
        }

        let count = definitions.len();
        for definition in definitions {
            insert(&mut materials, definition);
        }
        Ok(count)
    }

    pub fn remove(&self, id: &str) -> Result<MaterialDefinition> {
        let mut materials = self.materials.borrow_mut();
        match materials.get(id) {
            None => return Err(BlobVizError::MaterialNotFound(id.to_string())),
            Some(existing) if existing.material_type == MaterialType::Builtin => {
                return Err(BlobVizError::msg(format!(
                    "cannot remove built-in material `{id}`"
                )))
            }
            Some(_) => {}
        }

        let mut current = self.current.borrow_mut();
        if current.as_deref() == Some(id) {
            *current = None;
        }
        materials
            .remove(id)
            .ok_or_else(|| BlobVizError::MaterialNotFound(id.to_string()))
    }

    pub fn set_current(&self, id: &str) -> Result<()> {
        if !self.materials.borrow().contains_key(id) {
            return Err(BlobVizError::MaterialNotFound(id.to_string()));
        }
        *self.current.borrow_mut() = Some(id.to_string());
        Ok(())
    }

    /// Sorted material ids.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.materials.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Sorted `(id, name, type)` triples for listing.
    pub fn summaries(&self) -> BTreeMap<String, (String, MaterialType)> {
        self.materials
            .borrow()
            .values()
            .map(|d| (d.id.clone(), (d.name.clone(), d.material_type)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.materials.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.borrow().is_empty()
    }
}

impl MaterialManager for MaterialLibrary {
    fn material(&self, id: &str) -> Option<MaterialDefinition> {
        self.materials.borrow().get(id).cloned()
    }

    fn current_material(&self) -> Option<String> {
        self.current.borrow().clone()
    }
}

fn check_replaceable(materials: &HashMap<String, MaterialDefinition>, id: &str) -> Result<()> {
    match materials.get(id) {
        Some(existing) if existing.material_type == MaterialType::Builtin => Err(
            BlobVizError::msg(format!("cannot replace built-in material `{id}`")),
        ),
        _ => Ok(()),
    }
}

fn insert(materials: &mut HashMap<String, MaterialDefinition>, mut definition: MaterialDefinition) {
    if definition.material_type == MaterialType::Builtin {
        definition.material_type = MaterialType::User;
    }
    tracing::debug!(id = %definition.id, kind = ?definition.material_type, "registered material");
    materials.insert(definition.id.clone(), definition);
}

fn builtin(id: &str, name: &str, edit: impl FnOnce(&mut PropertySet)) -> MaterialDefinition {
    let mut properties = PropertySet::default();
    edit(&mut properties);
    MaterialDefinition {
        id: id.to_string(),
        name: name.to_string(),
        material_type: MaterialType::Builtin,
        properties,
    }
}

/// The presets shipped with the visualiser.
pub fn builtin_materials() -> Vec<MaterialDefinition> {
    vec![
        builtin("water", "Water", |_| {}),
        builtin("ice", "Ice", |p| {
            p.physical.density = 917.0;
            p.optical.base_color = [0.8, 0.9, 1.0, 0.9];
            p.optical.refraction_index = 1.31;
            p.optical.scattering = 0.3;
            p.optical.roughness = 0.2;
            p.thermal.specific_heat = 2100.0;
        }),
        builtin("steam", "Steam", |p| {
            p.physical.density = 0.6;
            p.physical.viscosity = 1.2e-5;
            p.physical.surface_tension = 0.0;
            p.optical.base_color = [0.95, 0.95, 0.95, 0.3];
            p.optical.transparency = 0.95;
            p.optical.scattering = 0.8;
            p.optical.refraction_index = 1.0;
            p.thermal.specific_heat = 2010.0;
        }),
        builtin("metal_gold", "Liquid Gold", |p| {
            p.physical.density = 17_310.0;
            p.physical.viscosity = 0.005;
            p.physical.surface_tension = 1.14;
            p.physical.thermal_conductivity = 318.0;
            p.optical.base_color = [1.0, 0.77, 0.34, 1.0];
            p.optical.metallic = 1.0;
            p.optical.roughness = 0.15;
            p.optical.transparency = 0.0;
            p.optical.specular = 0.9;
            p.electrical.conductivity = 4.1e7;
            p.electrical.dielectric_constant = 1.0;
            p.thermal.specific_heat = 129.0;
            p.thermal.melting_point = 1337.33;
            p.thermal.boiling_point = 3129.0;
        }),
        builtin("mercury", "Mercury", |p| {
            p.physical.density = 13_534.0;
            p.physical.viscosity = 0.0015;
            p.physical.surface_tension = 0.485;
            p.optical.base_color = [0.75, 0.76, 0.78, 1.0];
            p.optical.metallic = 1.0;
            p.optical.roughness = 0.05;
            p.optical.transparency = 0.0;
            p.electrical.conductivity = 1.04e6;
            p.thermal.specific_heat = 140.0;
            p.thermal.melting_point = 234.32;
            p.thermal.boiling_point = 629.88;
        }),
        builtin("lava", "Lava", |p| {
            p.physical.density = 2600.0;
            p.physical.viscosity = 100.0;
            p.physical.surface_tension = 0.4;
            p.optical.base_color = [1.0, 0.3, 0.05, 1.0];
            p.optical.emission = [1.0, 0.35, 0.05];
            p.optical.transparency = 0.0;
            p.optical.roughness = 0.7;
            p.thermal.specific_heat = 1600.0;
            p.thermal.melting_point = 1000.0;
            p.thermal.boiling_point = 2500.0;
        }),
        builtin("plasma_gas", "Plasma", |p| {
            p.physical.density = 0.01;
            p.physical.viscosity = 1.0e-6;
            p.physical.surface_tension = 0.0;
            p.optical.base_color = [0.6, 0.3, 1.0, 0.5];
            p.optical.emission = [0.8, 0.4, 1.0];
            p.optical.transparency = 0.9;
            p.optical.refraction_index = 1.0;
            p.electrical.conductivity = 1.0e4;
            p.thermal.melting_point = 0.0;
            p.thermal.boiling_point = 0.0;
        }),
        builtin("glass", "Molten Glass", |p| {
            p.physical.density = 2500.0;
            p.physical.viscosity = 1.0e3;
            p.physical.surface_tension = 0.3;
            p.optical.base_color = [0.9, 0.95, 0.95, 0.6];
            p.optical.refraction_index = 1.52;
            p.optical.transparency = 0.95;
            p.optical.specular = 0.8;
            p.thermal.specific_heat = 840.0;
            p.thermal.melting_point = 1673.0;
            p.thermal.boiling_point = 2503.0;
        }),
        builtin("honey", "Honey", |p| {
            p.physical.density = 1420.0;
            p.physical.viscosity = 10.0;
            p.physical.surface_tension = 0.05;
            p.optical.base_color = [0.95, 0.65, 0.1, 0.85];
            p.optical.refraction_index = 1.5;
            p.optical.transparency = 0.6;
            p.optical.scattering = 0.2;
            p.thermal.specific_heat = 2500.0;
            p.thermal.melting_point = 233.0;
        }),
        builtin("oil", "Oil", |p| {
            p.physical.density = 920.0;
            p.physical.viscosity = 0.08;
            p.physical.surface_tension = 0.032;
            p.optical.base_color = [0.3, 0.25, 0.1, 0.9];
            p.optical.refraction_index = 1.47;
            p.optical.transparency = 0.5;
            p.optical.specular = 0.7;
            p.thermal.specific_heat = 1970.0;
            p.thermal.melting_point = 256.0;
            p.thermal.boiling_point = 573.0;
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_builtins() {
        let library = MaterialLibrary::with_builtins();
        let ice = library.material("ice").expect("ice preset");
        assert_eq!(ice.material_type, MaterialType::Builtin);
        assert_eq!(ice.properties.thermal.melting_point, 273.15);
        assert!(library.ids().contains(&"metal_gold".to_string()));
        assert_eq!(library.len(), builtin_materials().len());
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let library = MaterialLibrary::with_builtins();
        assert!(library.material("unobtainium").is_none());

        let err = library.set_current("unobtainium").unwrap_err();
        assert!(format!("{err}").contains("unobtainium"));
        assert_eq!(library.current_material(), None);
    }

    #[test]
    fn builtins_are_protected() {
        let library = MaterialLibrary::with_builtins();
        assert!(library.remove("water").is_err());
        let replacement = MaterialDefinition::new("water", "Fake", PropertySet::default());
        assert!(library.register(replacement).is_err());
    }

    #[test]
    fn loads_user_materials_from_json() {
        let library = MaterialLibrary::new();
        let count = library
            .load_json(
                r#"[{"id":"slime","name":"Slime","properties":{"physical":{"viscosity":3.0}}},
                    {"id":"spark","name":"Spark","materialType":"runtime"}]"#,
            )
            .unwrap();

        assert_eq!(count, 2);
        let slime = library.material("slime").unwrap();
        assert_eq!(slime.material_type, MaterialType::User);
        assert_eq!(slime.properties.physical.viscosity, 3.0);
        assert_eq!(
            library.material("spark").unwrap().material_type,
            MaterialType::Runtime
        );
    }

    #[test]
    fn rejected_pack_leaves_library_unchanged() {
        let library = MaterialLibrary::with_builtins();
        let before = library.ids();

        let err = library
            .load_json(r#"[{"id":"slime","name":"Slime"},{"id":"water","name":"Fake"}]"#)
            .unwrap_err();

        assert!(format!("{err}").contains("water"));
        assert_eq!(library.ids(), before);
        assert!(library.material("slime").is_none());
        assert_eq!(library.material("water").unwrap().name, "Water");
    }

    #[test]
    fn duplicate_ids_within_a_pack_are_rejected() {
        let library = MaterialLibrary::new();
        let err = library
            .load_json(r#"[{"id":"goo","name":"Goo"},{"id":"goo","name":"More goo"}]"#)
            .unwrap_err();

        assert!(format!("{err}").contains("twice"));
        assert!(library.is_empty());
    }

    #[test]
    fn removing_current_material_clears_selection() {
        let library = MaterialLibrary::new();
        library
            .register(MaterialDefinition::new("goo", "Goo", PropertySet::default()))
            .unwrap();
        library.set_current("goo").unwrap();
        assert_eq!(library.current_material().as_deref(), Some("goo"));

        library.remove("goo").unwrap();
        assert_eq!(library.current_material(), None);
        assert!(library.is_empty());
    }
}
