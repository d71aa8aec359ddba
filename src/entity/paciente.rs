use super::{Entity, FieldSpec};

/// Rows of `pacientes(codigo, cpf, nome_completo, genero, cod_municipio, bairro, convenio, cid)`.
///
/// Patient exports from some producers capitalize field names, so every
/// column also accepts its capitalized spelling.
pub struct Paciente;

impl Entity for Paciente {
    const NAME: &'static str = "paciente";
    const TABLE: &'static str = "pacientes";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("codigo", &["id", "codigo", "Codigo"]),
        FieldSpec::optional("cpf", &["cpf", "CPF"]),
        FieldSpec::required("nome_completo", &["nome_completo", "Nome_Completo"]),
        FieldSpec::optional("genero", &["genero", "Genero"]),
        FieldSpec::required(
            "cod_municipio",
            &["cod_municipio", "cidade", "Cod_Municipio", "Cidade"],
        ),
        FieldSpec::optional("bairro", &["bairro", "Bairro"]),
        FieldSpec::optional("convenio", &["convenio", "Convenio"]),
        FieldSpec::optional("cid", &["cid", "CID"]),
    ];
}
