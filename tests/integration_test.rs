//! End-to-end tests for the ingestion pipeline: convert, normalize, validate,
//! build, execute.

use health_ingest::convert::convert;
use health_ingest::entity::{Entity, Hospital, Medico, Paciente, SqlValue};
use health_ingest::normalize::normalize;
use health_ingest::sql::{build_insert, split_statements, validate};
use health_ingest::{
    EntityKind, MemoryStore, MigrationExecutor, RawRecord, RawValue, Scratch, Store, UploadError,
    UploadService,
};
use tempfile::TempDir;

const HOSPITAL_CSV: &[u8] = b"codigo,nome,cod_municipio,bairro\nH1,Hosp A,1100015,Centro\n";

fn upload_service(dir: &TempDir) -> UploadService<MemoryStore> {
    let scratch = Scratch::new(dir.path());
    let executor = MigrationExecutor::new(MemoryStore::new(), scratch.sql_dir());
    UploadService::new(executor, scratch)
}

#[test]
fn test_csv_hospital_end_to_end() {
    let parsed = convert(HOSPITAL_CSV, ".csv").unwrap();
    let records = normalize(parsed).unwrap();
    assert_eq!(records.len(), 1);
    assert!(Hospital::is_valid(&records[0]));

    let fields = Hospital::sanitize(&records[0]);
    let columns: Vec<_> = fields.iter().map(|(column, _)| column).collect();
    assert_eq!(
        columns,
        vec!["codigo", "nome", "cod_municipio", "bairro", "especialidades", "leitos"]
    );
    assert_eq!(fields.get("nome"), Some(&SqlValue::Text("Hosp A".to_string())));
    assert_eq!(fields.get("especialidades"), Some(&SqlValue::Null));
    assert_eq!(fields.get("leitos"), Some(&SqlValue::Null));

    let statement = build_insert(Hospital::TABLE, &fields).unwrap();
    assert_eq!(
        statement.as_str(),
        "INSERT INTO hospitais (codigo, nome, cod_municipio, bairro) VALUES ('H1', 'Hosp A', '1100015', 'Centro') ON CONFLICT (codigo) DO NOTHING;"
    );
    assert!(validate(statement.as_str()).is_valid);
}

#[test]
fn test_missing_required_field_is_counted_not_raised() {
    let dir = TempDir::new().unwrap();
    let mut service = upload_service(&dir);
    let csv = b"codigo,nome,cod_municipio,bairro\nH1,Hosp A,1100015,\nH2,Hosp B,1100015,Norte\n";

    let summary = service.upload(EntityKind::Hospital, "hospitais.csv", csv).unwrap();
    assert_eq!(summary.processed_count, 1);
    assert_eq!(summary.error_count, 1);
    assert!(summary.errors[0].contains("bairro"));

    let executed = service.executor().store().executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].contains("'H2'"));
}

#[test]
fn test_sentinel_key_is_rejected_before_sanitize() {
    let document = RawValue::from(serde_json::json!({
        "codigo": "undefined",
        "nome": " Foo ",
        "cod_municipio": "1",
        "bairro": "Centro"
    }));
    let record: RawRecord = document.as_mapping().unwrap().clone();

    assert!(!Hospital::is_valid(&record));
    let fields = Hospital::sanitize(&record);
    assert_eq!(fields.get("codigo"), Some(&SqlValue::Null));
    assert_eq!(fields.get("nome"), Some(&SqlValue::Text("Foo".to_string())));
}

#[test]
fn test_same_record_builds_identical_sql_and_inserts_once() {
    let records = normalize(convert(HOSPITAL_CSV, ".csv").unwrap()).unwrap();
    let first = build_insert(Hospital::TABLE, &Hospital::sanitize(&records[0])).unwrap();
    let second = build_insert(Hospital::TABLE, &Hospital::sanitize(&records[0])).unwrap();
    assert_eq!(first, second);

    let mut store = MemoryStore::new();
    store.connect().unwrap();
    store.execute(first.as_str()).unwrap();
    store.execute(second.as_str()).unwrap();
    assert_eq!(store.row_count("hospitais"), 1);
}

#[test]
fn test_generated_script_survives_split() {
    let json = br#"[
        {"codigo": "H1", "nome": "Hosp A", "cidade": "1", "bairro": "Centro", "especialidades": "Cardiologia; Pediatria"},
        {"codigo": "H2", "nome": "Santa Maria D'Ajuda", "cidade": "2", "bairro": "Sul"}
    ]"#;
    let records = normalize(convert(json, ".json").unwrap()).unwrap();
    let statements: Vec<_> = records
        .iter()
        .map(|r| build_insert(Hospital::TABLE, &Hospital::sanitize(r)).unwrap())
        .collect();

    let script: String = statements.iter().map(|s| format!("{}\n", s)).collect();
    assert!(validate(&script).is_valid);

    let split = split_statements(&script);
    assert_eq!(split.len(), 2);
    for (piece, original) in split.iter().zip(&statements) {
        assert_eq!(format!("{};", piece), original.as_str());
    }
}

#[test]
fn test_xml_wrapper_upload() {
    let dir = TempDir::new().unwrap();
    let mut service = upload_service(&dir);
    let xml = br#"<Medicos>
        <Medico><id>M1</id><nome_completo>Ana Souza</nome_completo><cidade>1100015</cidade></Medico>
        <Medico><id>M2</id><nome_completo>Bruno Lima</nome_completo><cidade>1100015</cidade><especialidade>Pediatria</especialidade></Medico>
    </Medicos>"#;

    let summary = service.upload(EntityKind::Medico, "medicos.XML", xml).unwrap();
    assert_eq!(summary.entity, "medico");
    assert_eq!(summary.processed_count, 2);
    assert_eq!(service.executor().store().row_count(Medico::TABLE), 2);
    assert!(service.executor().store().executed()[1].contains("'Pediatria'"));
}

#[test]
fn test_paciente_capitalized_aliases() {
    let json = br#"{"Codigo": "P1", "Nome_Completo": "Carla", "Cidade": "3550308", "CPF": "123", "Convenio": "null"}"#;
    let records = normalize(convert(json, ".fhir").unwrap()).unwrap();
    assert!(Paciente::is_valid(&records[0]));

    let statement = build_insert(Paciente::TABLE, &Paciente::sanitize(&records[0])).unwrap();
    assert_eq!(
        statement.as_str(),
        "INSERT INTO pacientes (codigo, cpf, nome_completo, cod_municipio) VALUES ('P1', '123', 'Carla', '3550308') ON CONFLICT (codigo) DO NOTHING;"
    );
}

#[test]
fn test_upload_rejects_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let mut service = upload_service(&dir);

    let err = service.upload(EntityKind::Hospital, "hospitais.pdf", b"%PDF").unwrap_err();
    assert!(matches!(err, UploadError::UnsupportedExtension { .. }));
    assert!(err.to_string().contains(".xlsx, .xml, .json, .hl7, .fhir, .csv"));
    assert_eq!(service.executor().store().connect_count(), 0);
}

#[test]
fn test_upload_rejects_scalar_document() {
    let dir = TempDir::new().unwrap();
    let mut service = upload_service(&dir);

    let err = service.upload(EntityKind::Paciente, "p.json", b"42").unwrap_err();
    assert!(matches!(err, UploadError::Shape(_)));
    assert_eq!(service.executor().store().connect_count(), 0);
}

#[test]
fn test_upload_cleans_up_snapshot() {
    let dir = TempDir::new().unwrap();
    let mut service = upload_service(&dir);
    service.upload(EntityKind::Hospital, "h.csv", HOSPITAL_CSV).unwrap();

    let leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .count();
    assert_eq!(leftovers, 0);
    assert!(!service.executor().store().is_connected());
}

#[test]
fn test_hl7_segments_are_not_records() {
    let hl7 = b"MSH|^~\\&|HOSP\rPID|1||P1\rPID|2||P2\r";
    let parsed = convert(hl7, ".hl7").unwrap();
    let pid = parsed.as_mapping().unwrap()["PID"].as_sequence().unwrap();
    assert_eq!(pid.len(), 2);

    let records = normalize(parsed).unwrap();
    assert_eq!(records.len(), 1);
    assert!(!Paciente::is_valid(&records[0]));
}
