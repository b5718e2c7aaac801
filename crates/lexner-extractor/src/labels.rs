//! Open-vocabulary label mapping
//!
//! Upstream extractors label candidates with whatever vocabulary the model
//! felt like using that day (`persona`, `PER`, `Organización`, `law`...).
//! This maps them onto the closed [`EntityType`] set.

use lexner_core::{EntityType, LexError, Result};

use crate::normalize::normalize;

/// Map an upstream label to an entity type.
///
/// Unknown labels become [`EntityType::Other`]; a missing or blank label is a
/// [`LexError::MalformedCandidate`], which callers recover by defaulting to
/// OTHER as well.
pub fn map_label(label: Option<&str>) -> Result<EntityType> {
    let label = label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| LexError::MalformedCandidate("candidate has no type".to_string()))?;

    if let Ok(canonical) = label.parse::<EntityType>() {
        return Ok(canonical);
    }

    let key = normalize(label).replace(['-', ' ', '.'], "_");
    Ok(alias(&key).unwrap_or(EntityType::Other))
}

fn alias(key: &str) -> Option<EntityType> {
    let entity_type = match key {
        "persona" | "personas" | "per" | "pers" | "nombre" | "person_name" | "individuo"
        | "acusado" | "procesado" | "victima" | "juez" => EntityType::Person,

        "organizacion" | "organizaciones" | "org" | "organisation" | "institucion"
        | "entidad" | "empresa" | "compania" | "institution" | "company" | "tribunal" => {
            EntityType::Organization
        }

        "articulo" | "articulos" | "art" | "article" | "articulo_legal" | "norma"
        | "legal_reference" | "citation" | "cita_legal" => EntityType::LegalArticle,

        "fecha" | "fechas" | "date_time" | "datetime" | "time" => EntityType::Date,

        "ley" | "leyes" | "codigo" | "obra_legal" | "cuerpo_legal" | "law" | "statute"
        | "legislation" | "normativa" | "reglamento" | "constitucion" => EntityType::LegalWork,

        "delito" | "delitos" | "infraccion" | "tipo_penal" | "crimen" | "offense" | "offence" => {
            EntityType::Crime
        }

        "numero_de_caso" | "numero_caso" | "caso" | "causa" | "juicio" | "expediente"
        | "proceso" | "case" | "case_id" | "docket" => EntityType::CaseNumber,

        "lugar" | "lugares" | "loc" | "location" | "ubicacion" | "gpe" | "ciudad" | "provincia"
        | "direccion" => EntityType::Place,

        "formula_judicial" | "formula" | "formula_sentencia" | "judicial_formula_text" => {
            EntityType::JudicialFormula
        }

        "otro" | "otros" | "misc" | "miscelaneo" | "concepto" => EntityType::Other,

        _ => return None,
    };
    Some(entity_type)
}
