use super::{Entity, FieldSpec};

/// Rows of `medicos(codigo, nome_completo, especialidade_medico, cod_municipio)`.
///
/// Physician exports identify the record by `id`; older ones use `codigo`.
pub struct Medico;

impl Entity for Medico {
    const NAME: &'static str = "medico";
    const TABLE: &'static str = "medicos";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("codigo", &["id", "codigo"]),
        FieldSpec::required("nome_completo", &["nome_completo"]),
        FieldSpec::optional("especialidade_medico", &["especialidade_medico", "especialidade"]),
        FieldSpec::required("cod_municipio", &["cod_municipio", "cidade"]),
    ];
}
