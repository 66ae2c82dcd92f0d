//! Small results tables shared by the unit tests.

use crate::dataset::{Dataset, REQUIRED_COLUMNS};

pub fn csv(rows: &[String]) -> String {
    let mut text = REQUIRED_COLUMNS.join(",");
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

/// A BSc Physics row with only the interesting columns varied.
pub fn row(regnum: &str, module: &str, mark: &str, decision: &str, gender: &str) -> String {
    line(
        regnum,
        module,
        mark,
        decision,
        gender,
        ("Science", "BSc Physics", "PHY"),
        ("Full Time", "2023", "1"),
    )
}

fn line(
    regnum: &str,
    module: &str,
    mark: &str,
    decision: &str,
    gender: &str,
    (faculty, programme, code): (&str, &str, &str),
    (attendance, year, semester): (&str, &str, &str),
) -> String {
    let grade = match mark.parse::<f64>() {
        Ok(m) if m >= 70.0 => "A",
        Ok(m) if m >= 60.0 => "B",
        Ok(m) if m >= 50.0 => "C",
        _ => "F",
    };
    format!(
        "{regnum},{module},{mark},{grade},{decision},{gender},{faculty},{programme},{code},Degree,\
         {attendance},{year},{semester},Active,First{regnum},Sur{regnum}"
    )
}

/// Two faculties, three programmes, a mix of decisions, attendance types,
/// years and semesters.
pub fn dataset() -> Dataset {
    let physics = ("Science", "BSc Physics", "PHY");
    let chemistry = ("Science", "BSc Chemistry", "CHM");
    let history = ("Arts", "BA History", "HIS");
    let ft_2023_1 = ("Full Time", "2023", "1");

    let rows = vec![
        line("R1", "PHY101", "45", "PASS", "male", physics, ft_2023_1),
        line("R1", "PHY102", "52", "PASS", "male", physics, ft_2023_1),
        line("R1", "PHY103", "60", "PASS", "male", physics, ft_2023_1),
        line("R1", "PHY104", "38", "PASS", "male", physics, ft_2023_1),
        line("R2", "CHM101", "70", "PASS", "female", chemistry, ft_2023_1),
        line("R3", "CHM101", "40", "RETAKE", "male", chemistry, ft_2023_1),
        line("R3", "CHM102", "30", "RETAKE", "male", chemistry, ft_2023_1),
        line("R4", "CHM101", "80", "PASS", "female", chemistry, ft_2023_1),
        line("R9", "CHM101", "58", "PASS", "male", chemistry, ft_2023_1),
        line("R5", "CHM201", "66", "PASS", "female", chemistry, ("Part Time", "2024", "2")),
        line("R8", "CHM101", "20", "REPEAT", "male", chemistry, ("Full Time", "2023", "2")),
        line("R6", "HIS101", "75", "PASS", "female", history, ("Full Time", "2022", "1")),
        line("R7", "HIS101", "35", "FAIL", "male", history, ("Full Time", "2022", "1")),
    ];

    Dataset::from_reader(csv(&rows).as_bytes()).expect("fixture table loads")
}
