//! Python helpers embedded into composed scripts.

/// Reads a host table: header row (`Row ID` first), a row of dtype names,
/// then data. Columns whose dtype cannot be applied keep the inferred type.
pub(super) const READ_CSV: &str = r#"import pandas as pd

def read_csv(csv_filename):
    pdf = pd.read_csv(csv_filename, skiprows=[1], sep=',', header=0, index_col=0)
    typesdf = pd.read_csv(csv_filename, sep=',', nrows=1).drop('Row ID', axis=1)
    for col in typesdf:
        wanted = {col: typesdf.iloc[0][col]}
        try:
            pdf = pdf.astype(wanted)
        except Exception:
            print("could not convert column {} to {}".format(col, wanted[col]))
    return pdf
"#;
