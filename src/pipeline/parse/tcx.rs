use crate::error::ParseError;
use crate::pipeline::parse::xml::{self, Node};
use crate::pipeline::parse::{sniff_text, Parser};
use crate::types::activity::{FileFormat, RawActivity, RawLap, RawRecord, SensorStats};

const ROOT: &str = "TrainingCenterDatabase";

pub(crate) fn sniff(bytes: &[u8]) -> bool {
    sniff_text(bytes, &[ROOT, "<Activities>"])
}

pub struct TcxParser;

impl Parser for TcxParser {
    fn parse(&self, bytes: &[u8]) -> Result<RawActivity, ParseError> {
        let mut builder = TcxBuilder::default();
        let root = xml::walk(bytes, FileFormat::Tcx, |path, node| builder.visit(path, node))?;

        if xml::local_name(&root) != ROOT {
            return Err(ParseError::decode(
                FileFormat::Tcx,
                format!("expected <{}> root, found <{}>", ROOT, root),
            ));
        }
        if builder.activities == 0 {
            return Err(ParseError::EmptyActivity(FileFormat::Tcx));
        }
        if builder.activities > 1 {
            tracing::debug!("TCX file holds {} activities, using the first", builder.activities);
        }

        Ok(builder.finish())
    }
}

#[derive(Default)]
struct LapBuilder {
    lap: RawLap,
    calories: Option<f64>,
    heart_rate: SensorStats,
    cadence: SensorStats,
}

#[derive(Default)]
struct TcxBuilder {
    activities: usize,
    in_activity: bool,
    lap: Option<LapBuilder>,
    point: Option<RawRecord>,
    laps: Vec<RawLap>,
    records: Vec<RawRecord>,
    calories: f64,
    heart_rate: SensorStats,
    cadence: SensorStats,
}

impl TcxBuilder {
    fn visit(&mut self, path: &[String], node: Node<'_>) -> Result<(), ParseError> {
        match node {
            Node::Open(_) => self.open(path),
            Node::Close => self.close(path),
            Node::Text(text) if self.in_activity => self.text(path, text),
            Node::Text(_) => {}
        }
        Ok(())
    }

    fn open(&mut self, path: &[String]) {
        match xml::tail(path, 2).as_slice() {
            ["Activities", "Activity"] => {
                self.activities += 1;
                self.in_activity = self.activities == 1;
            }
            ["Activity", "Lap"] if self.in_activity => self.lap = Some(LapBuilder::default()),
            [_, "Trackpoint"] if self.in_activity && self.lap.is_some() => {
                self.point = Some(RawRecord::default())
            }
            _ => {}
        }
    }

    fn close(&mut self, path: &[String]) {
        match xml::tail(path, 2).as_slice() {
            ["Activities", "Activity"] => self.in_activity = false,
            [_, "Trackpoint"] => {
                if let (Some(point), Some(lap)) = (self.point.take(), self.lap.as_mut()) {
                    lap.heart_rate.push(point.heart_rate);
                    lap.cadence.push(point.cadence);
                    self.heart_rate.push(point.heart_rate);
                    self.cadence.push(point.cadence);
                    self.records.push(point);
                }
            }
            ["Activity", "Lap"] => {
                if let Some(builder) = self.lap.take() {
                    self.calories += builder.calories.unwrap_or(0.0);
                    self.laps.push(finish_lap(builder));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, path: &[String], text: &str) {
        let tail = xml::tail(path, 3);

        if let Some(point) = self.point.as_mut() {
            match tail.as_slice() {
                [_, "Trackpoint", "Time"] => point.timestamp = xml::timestamp(text),
                [_, "Trackpoint", "DistanceMeters"] => point.distance = xml::number(text),
                [_, "Trackpoint", "AltitudeMeters"] => point.altitude = xml::number(text),
                [_, "Trackpoint", "Cadence"] => point.cadence = xml::number(text),
                [_, "HeartRateBpm", "Value"] => point.heart_rate = xml::number(text),
                [_, "TPX", "Speed"] => point.speed = xml::number(text),
                [_, "TPX", "RunCadence"] if point.cadence.is_none() => {
                    point.cadence = xml::number(text)
                }
                _ => {}
            }
            return;
        }

        if let Some(builder) = self.lap.as_mut() {
            let lap = &mut builder.lap;
            match tail.as_slice() {
                [_, "Lap", "TotalTimeSeconds"] => lap.elapsed_time = xml::number(text),
                [_, "Lap", "DistanceMeters"] => lap.distance = xml::number(text),
                [_, "Lap", "Calories"] => builder.calories = xml::number(text),
                [_, "Lap", "Cadence"] => lap.avg_cadence = xml::number(text),
                [_, "AverageHeartRateBpm", "Value"] => lap.avg_heart_rate = xml::number(text),
                [_, "MaximumHeartRateBpm", "Value"] => lap.max_heart_rate = xml::number(text),
                [_, "LX", "AvgSpeed"] => lap.avg_speed = xml::number(text),
                [_, "LX", "AvgRunCadence"] if lap.avg_cadence.is_none() => {
                    lap.avg_cadence = xml::number(text)
                }
                [_, "LX", "MaxRunCadence"] => lap.max_cadence = xml::number(text),
                _ => {}
            }
        }
    }

    fn finish(self) -> RawActivity {
        let mut activity = RawActivity::default();

        if !self.laps.is_empty() {
            let session = &mut activity.session;
            session.elapsed_time = Some(self.laps.iter().filter_map(|l| l.elapsed_time).sum());
            session.distance = Some(self.laps.iter().filter_map(|l| l.distance).sum());
            session.calories = Some(self.calories);
        }
        activity.session.avg_heart_rate = self.heart_rate.mean();
        activity.session.max_heart_rate = self.heart_rate.max();
        activity.session.avg_cadence = self.cadence.mean();
        activity.session.max_cadence = self.cadence.max();

        activity.laps = self.laps;
        activity.records = self.records;
        activity
    }
}

/// Lap summary elements win; the lap's own trackpoints fill whatever is missing.
fn finish_lap(builder: LapBuilder) -> RawLap {
    let LapBuilder {
        mut lap,
        heart_rate,
        cadence,
        ..
    } = builder;

    lap.avg_heart_rate = lap.avg_heart_rate.or_else(|| heart_rate.mean());
    lap.max_heart_rate = lap.max_heart_rate.or_else(|| heart_rate.max());
    lap.avg_cadence = lap.avg_cadence.or_else(|| cadence.mean());
    lap.max_cadence = lap.max_cadence.or_else(|| cadence.max());
    lap
}
