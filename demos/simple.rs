use syml_core::Document;

fn main() {
    let syml_data = "\
# Arena settings
settings:
    affect-hunger: true
    hunger-multiplier: 1.5
fruits:
    - apple
    - banana
";

    let mut doc = match Document::parse_str(syml_data) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Failed to parse SYML: {:?}", miette::Report::new(e));
            return;
        }
    };

    let multiplier = doc.get_double("settings.hunger-multiplier", 1.0);
    println!("Hunger multiplier: {multiplier}");

    if let Err(e) = doc.set("settings.max-players", 16) {
        eprintln!("Failed to update document: {e}");
        return;
    }
    println!("Updated SYML:\n{}", doc.encode());

    match doc.to_json() {
        Ok(json_output) => println!("As JSON:\n{json_output}"),
        Err(e) => eprintln!("Failed to export JSON: {e}"),
    }
}
