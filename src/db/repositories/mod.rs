mod comfort_predictions;
mod sensor_readings;
