use super::{Entity, FieldSpec};

/// Rows of `hospitais(codigo, nome, cod_municipio, bairro, especialidades, leitos)`.
pub struct Hospital;

impl Entity for Hospital {
    const NAME: &'static str = "hospital";
    const TABLE: &'static str = "hospitais";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("codigo", &["codigo"]),
        FieldSpec::required("nome", &["nome"]),
        FieldSpec::required("cod_municipio", &["cod_municipio", "cidade"]),
        FieldSpec::required("bairro", &["bairro"]),
        FieldSpec::optional("especialidades", &["especialidades", "especialidade"]),
        FieldSpec::optional("leitos", &["leitos", "leitos_totais"]).numeric(),
    ];
}
