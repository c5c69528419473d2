use std::io::Write;

use approx::assert_abs_diff_eq;
use indoc::indoc;

use super::*;

const RESULTS: &str = indoc! {r#"
    <?xml version="1.0" encoding="UTF-8"?>
    <VOTABLE version="1.3" xmlns="http://www.ivoa.net/xml/VOTable/v1.3">
      <RESOURCE type="results">
        <TABLE>
          <FIELD name="obs_id" datatype="long"/>
          <FIELD name="projectid" datatype="char"/>
          <FIELD name="center_frequency_mhz" datatype="double"/>
          <FIELD name="duration" datatype="int"/>
          <FIELD name="total_archived_data_bytes" datatype="long"/>
          <FIELD name="starttime_utc" datatype="char"/>
          <FIELD name="mwa_array_configuration" datatype="char"/>
          <DATA>
            <TABLEDATA>
              <TR><TD>1300000000</TD><TD>G0057</TD><TD>154.88</TD><TD>4800</TD><TD>2000000000000</TD><TD>2021-03-17T07:06:22</TD><TD>Phase II Compact</TD></TR>
              <TR><TD>1300010000</TD><TD>G0057</TD><TD>215.68</TD><TD>4800</TD><TD>3000000000000</TD><TD>2021-03-17T09:53:02</TD><TD>Phase II Extended</TD></TR>
              <TR><TD>1300020000</TD><TD>G0057</TD><TD>215.68</TD><TD>600</TD><TD>500000000000</TD><TD>2021-03-17T12:39:42</TD><TD>Phase II Extended</TD></TR>
              <TR><TD>1300030000</TD><TD>D0006</TD><TD>215.68</TD><TD>7200</TD><TD>1000000000000</TD><TD></TD><TD>Phase II Extended</TD></TR>
              <TR><TD>1300040000</TD><TD>G0057</TD><TD>184.96</TD><TD>3600</TD><TD>1500000000000</TD><TD>2021-03-17T18:13:02</TD><TD>Phase II Extended</TD></TR>
            </TABLEDATA>
          </DATA>
        </TABLE>
      </RESOURCE>
    </VOTABLE>
"#};

const CALIBRATORS: &str = indoc! {r#"
    <VOTABLE>
      <RESOURCE>
        <TABLE>
          <FIELD name="obs_id"/>
          <FIELD name="center_frequency_mhz"/>
          <DATA>
            <TABLEDATA>
              <TR><TD>1300010500</TD><TD>215.68</TD></TR>
              <TR><TD>1299999000</TD><TD>215.68</TD></TR>
              <TR><TD>1300009000</TD><TD>154.88</TD></TR>
            </TABLEDATA>
          </DATA>
        </TABLE>
      </RESOURCE>
    </VOTABLE>
"#};

#[test]
fn test_meta_value_parse() {
    assert_eq!(MetaValue::parse(Some("1300000000")), MetaValue::Int(1300000000));
    assert_eq!(MetaValue::parse(Some("154.88")), MetaValue::Float(154.88));
    assert_eq!(MetaValue::parse(Some("-5")), MetaValue::Float(-5.0));
    assert_eq!(
        MetaValue::parse(Some("G0057")),
        MetaValue::Str("G0057".to_string())
    );
    assert_eq!(MetaValue::parse(None), MetaValue::Null);
}

#[test]
fn test_parse_votable() {
    let obs = parse_asvo_xml(RESULTS).unwrap();
    assert_eq!(obs.len(), 5);
    let first = &obs[0];
    assert_eq!(
        first.fields.keys().collect::<Vec<_>>(),
        [
            "obs_id",
            "projectid",
            "center_frequency_mhz",
            "duration",
            "total_archived_data_bytes",
            "starttime_utc",
            "mwa_array_configuration"
        ]
    );
    assert_eq!(first.obs_id().unwrap(), 1300000000);
    assert_eq!(first.project_id().unwrap(), "G0057");
    assert_abs_diff_eq!(first.centre_freq_mhz().unwrap(), 154.88);
    assert_eq!(
        first.get("mwa_array_configuration"),
        Some(&MetaValue::Str("Phase II Compact".to_string()))
    );
    // An empty cell.
    assert_eq!(obs[3].get("starttime_utc"), Some(&MetaValue::Null));
}

#[test]
fn test_parse_errors() {
    assert!(matches!(
        parse_asvo_xml("<VOTABLE><RESOURCE/></VOTABLE>"),
        Err(ObsMetadataError::NoTable)
    ));
    assert!(matches!(
        parse_asvo_xml("<VOTABLE><TABLE>"),
        Err(ObsMetadataError::Xml(_))
    ));

    let obs = parse_asvo_xml(CALIBRATORS).unwrap();
    assert!(matches!(
        obs[0].duration_s(),
        Err(ObsMetadataError::MissingField {
            field: "duration",
            ..
        })
    ));
}

#[test]
fn test_counts() {
    let obs = parse_asvo_xml(RESULTS).unwrap();
    let by_project = project_frequency_counts(&obs).unwrap();
    let rows: Vec<(String, f64, usize)> = by_project
        .iter()
        .map(|((p, f), &c)| (p.clone(), f.0, c))
        .collect();
    assert_eq!(
        rows,
        [
            ("D0006".to_string(), 215.68, 1),
            ("G0057".to_string(), 154.88, 1),
            ("G0057".to_string(), 184.96, 1),
            ("G0057".to_string(), 215.68, 2),
        ]
    );

    let by_freq = frequency_project_counts(&obs).unwrap();
    let first = by_freq.iter().next().unwrap();
    assert_eq!(first, (&(FreqKey(154.88), "G0057".to_string()), &1));
    assert_eq!(by_freq.len(), 4);

    assert_abs_diff_eq!(
        total_duration_hours(&obs).unwrap(),
        (4800.0 + 4800.0 + 600.0 + 7200.0 + 3600.0) / 3600.0
    );
}

#[test]
fn test_select_observations() {
    let obs = parse_asvo_xml(RESULTS).unwrap();
    let cals = parse_asvo_xml(CALIBRATORS).unwrap();
    let selection = select_observations(&obs, &cals, &SelectionCriteria::new("G0057")).unwrap();

    // 1300000000 is too low in frequency, 1300020000 too short, 1300030000 is
    // another project and 1300040000 has no calibrator.
    assert_eq!(selection.selected.len(), 1);
    let s = &selection.selected[0];
    assert_eq!(s.obs_id, 1300010000);
    assert_eq!(s.calibrator_id, 1300010500);
    assert_eq!(s.array_config, "Phase II Extended");
    assert_abs_diff_eq!(s.terabytes, 3.0);
    assert_abs_diff_eq!(selection.total_terabytes, 4.5);
    assert_eq!(
        selection.obs_to_keep.into_iter().collect::<Vec<_>>(),
        [1300010000, 1300010500]
    );
}

#[test]
fn test_read_from_file() {
    let mut tmp = tempfile::NamedTempFile::new().expect("Couldn't make tmp file");
    tmp.write_all(CALIBRATORS.as_bytes()).unwrap();
    tmp.flush().unwrap();
    let obs = read_asvo_xml(tmp.path()).unwrap();
    assert_eq!(obs.len(), 3);

    assert!(matches!(
        read_asvo_xml("/does/not/exist.xml"),
        Err(ObsMetadataError::Read { .. })
    ));
}
