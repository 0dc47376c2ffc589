use laporan::{
    fitting,
    layout::{self, Area, Element, Slot, PAGE_HEIGHT, PAGE_WIDTH},
    report::{FieldUpdate, ReportData, MAX_CHAR_COUNT},
};
use rand::{distributions::Alphanumeric, Rng};

fn random_text(rng: &mut impl Rng, length: usize) -> String {
    (0..length)
        .map(|index| {
            if index % 7 == 6 {
                ' '
            } else {
                char::from(rng.sample(Alphanumeric))
            }
        })
        .collect()
}

fn element_area(element: &Element) -> Area {
    match element {
        Element::Fill { area, .. }
        | Element::Outline { area, .. }
        | Element::Picture { area, .. }
        | Element::PhotoPlaceholder { area } => *area,
        Element::Text(block) => block.area,
    }
}

#[test]
fn random_reports_stay_on_one_page() {
    let mut rng = rand::thread_rng();
    let sheet = Area::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT);

    for _ in 0..40 {
        let title_length = rng.gen_range(0..160);
        let objective_length = rng.gen_range(0..=MAX_CHAR_COUNT);
        let organizer_length = rng.gen_range(0..80);
        let record = ReportData::default()
            .apply(FieldUpdate::Title(random_text(&mut rng, title_length)))
            .unwrap()
            .apply(FieldUpdate::Objective(random_text(&mut rng, objective_length)))
            .unwrap()
            .apply(FieldUpdate::Organizer(random_text(&mut rng, organizer_length)))
            .unwrap();

        let page = layout::render(&record);

        for element in &page.elements {
            assert!(sheet.contains(&element_area(element)), "{:?}", element);
        }
        let title = page.text(Slot::Title).unwrap();
        assert!(title.size <= fitting::TITLE.base_size);
        assert!(title.size >= fitting::TITLE.min_size);
        let objective = page.text(Slot::Objective).unwrap();
        assert!(objective.size >= fitting::BODY_PARAGRAPH.min_size);
    }
}

#[test]
fn longer_titles_never_grow() {
    let mut rng = rand::thread_rng();
    let mut previous_size = f32::INFINITY;

    for length in (1..120).step_by(3) {
        let record = ReportData::default()
            .apply(FieldUpdate::Title(random_text(&mut rng, length)))
            .unwrap();
        let size = layout::render(&record).text(Slot::Title).unwrap().size;

        assert!(size <= previous_size, "{} grew to {}", length, size);
        previous_size = size;
    }
}
